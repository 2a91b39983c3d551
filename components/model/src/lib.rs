//! Model layer for bridged objects
//!
//! A model is an immutable set of declared properties built from a
//! dictionary. Its equality and hash are structural over a set of key paths,
//! unless the class's interpreter table overrides them.
//!
//! # Example
//!
//! ```
//! use bridge::{HostValue, Mapping};
//! use model::{Model, ModelClass};
//!
//! struct Book;
//!
//! impl ModelClass for Book {
//!     const CLASS_NAME: &'static str = "Book";
//!     const PROPERTY_KEYS: &'static [&'static str] = &["title", "pages"];
//!
//!     fn validate(key: &str, value: &HostValue) -> Result<(), String> {
//!         match (key, value) {
//!             ("pages", HostValue::Integer(n)) if *n <= 0 => Err("must be positive".into()),
//!             _ => Ok(()),
//!         }
//!     }
//! }
//!
//! let mut dictionary = Mapping::new();
//! dictionary.insert("title".into(), "Moonlit".into());
//! let book = Model::<Book>::from_dictionary(&dictionary).unwrap();
//! assert_eq!(book.get("title"), Some(&HostValue::from("Moonlit")));
//! assert_eq!(book.dictionary_value()[&"pages".into()], HostValue::Null);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod class;
pub mod equality;

pub use class::{Model, ModelClass};
