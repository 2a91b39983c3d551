//! Unit tests for the model layer

use bridge::{ExecutionContext, HostValue, MapKey, Mapping, ResultCount};
use core_types::{BridgeError, ScriptSource};
use model::equality::{equality_key_paths, equals, hash};
use model::{Model, ModelClass};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dictionary(entries: &[(&str, HostValue)]) -> Mapping {
    entries
        .iter()
        .map(|(key, value)| (MapKey::from(*key), value.clone()))
        .collect()
}

fn decimal(text: &str) -> HostValue {
    HostValue::Decimal(Decimal::from_str(text).unwrap())
}

/// Compared on `sku` only.
struct Product;

impl ModelClass for Product {
    const CLASS_NAME: &'static str = "Product";
    const PROPERTY_KEYS: &'static [&'static str] = &["sku", "name", "price"];

    fn validate(key: &str, value: &HostValue) -> Result<(), String> {
        match key {
            "price" => match value.as_decimal() {
                Some(price) if price.is_sign_negative() => Err("must not be negative".into()),
                Some(_) => Ok(()),
                None => Err("must be a number".into()),
            },
            "sku" if value.as_str().is_none() => Err("must be text".into()),
            _ => Ok(()),
        }
    }

    fn implementation_source(_: &ExecutionContext) -> Option<ScriptSource> {
        Some(ScriptSource::text("return { equalityKeyPaths = { 'sku' } }"))
    }
}

/// Equality scripted entirely in the class table.
struct Cart;

impl ModelClass for Cart {
    const CLASS_NAME: &'static str = "Cart";
    const PROPERTY_KEYS: &'static [&'static str] = &["owner", "items"];

    fn implementation_source(_: &ExecutionContext) -> Option<ScriptSource> {
        Some(ScriptSource::text(
            r#"
            return {
                isEqual = function(self, selector, other)
                    return string.lower(self:owner()) == string.lower(other:owner())
                end,
                hash = function(self) return #self:owner() end,
            }
            "#,
        ))
    }
}

/// An override that always fails.
struct Flaky;

impl ModelClass for Flaky {
    const CLASS_NAME: &'static str = "Flaky";
    const PROPERTY_KEYS: &'static [&'static str] = &["id", "note"];

    fn implementation_source(_: &ExecutionContext) -> Option<ScriptSource> {
        Some(ScriptSource::text(
            "return { isEqual = function() error('cannot compare') end, equalityKeyPaths = { 'id' } }",
        ))
    }
}

/// Compared on a nested key path.
struct Listing;

impl ModelClass for Listing {
    const CLASS_NAME: &'static str = "Listing";
    const PROPERTY_KEYS: &'static [&'static str] = &["title", "price"];

    fn implementation_source(_: &ExecutionContext) -> Option<ScriptSource> {
        Some(ScriptSource::text(
            "return { equalityKeyPaths = { 'price.amount' } }",
        ))
    }
}

/// No script at all.
struct Plain;

impl ModelClass for Plain {
    const CLASS_NAME: &'static str = "PlainModelWithoutScript";
    const PROPERTY_KEYS: &'static [&'static str] = &["a", "b"];
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_from_dictionary_assigns_declared_keys() {
    let product = Model::<Product>::from_dictionary(&dictionary(&[
        ("sku", HostValue::from("MOON-1")),
        ("name", HostValue::from("Moon lamp")),
        ("price", decimal("19.99")),
        ("colour", HostValue::from("silver")),
    ]))
    .unwrap();
    assert_eq!(product.get("sku"), Some(&HostValue::from("MOON-1")));
    assert_eq!(product.get("price"), Some(&decimal("19.99")));
    assert!(product.get("colour").is_none());
    assert_eq!(product.properties().len(), 3);
}

#[test]
fn test_validation_failure_yields_no_instance() {
    let err = Model::<Product>::from_dictionary(&dictionary(&[
        ("sku", HostValue::from("MOON-1")),
        ("price", decimal("-1")),
    ]))
    .unwrap_err();
    match err {
        BridgeError::Validation { key, reason } => {
            assert_eq!(key, "price");
            assert_eq!(reason, "must not be negative");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_dictionary_value_is_inverse() {
    let input = dictionary(&[
        ("sku", HostValue::from("MOON-2")),
        ("name", HostValue::from("Moon globe")),
        ("price", decimal("5.00")),
    ]);
    let product = Model::<Product>::from_dictionary(&input).unwrap();
    assert_eq!(product.dictionary_value(), input);
}

#[test]
fn test_dictionary_value_marks_unset_properties() {
    let product =
        Model::<Product>::from_dictionary(&dictionary(&[("sku", HostValue::from("X"))])).unwrap();
    let value = product.dictionary_value();
    assert_eq!(value.len(), 3);
    assert_eq!(value[&MapKey::from("name")], HostValue::Null);
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_difference_outside_key_paths_is_equal() {
    let a = Model::<Product>::shared(&dictionary(&[
        ("sku", HostValue::from("MOON-1")),
        ("name", HostValue::from("Moon lamp")),
    ]))
    .unwrap();
    let b = Model::<Product>::shared(&dictionary(&[
        ("sku", HostValue::from("MOON-1")),
        ("name", HostValue::from("Lunar lamp")),
    ]))
    .unwrap();
    assert_eq!(equality_key_paths::<Product>(), vec!["sku".to_string()]);
    assert!(equals(&a, &b));
    assert_eq!(hash(&a), hash(&b));
}

#[test]
fn test_difference_inside_key_paths_is_unequal() {
    let a = Model::<Product>::shared(&dictionary(&[("sku", HostValue::from("MOON-1"))])).unwrap();
    let b = Model::<Product>::shared(&dictionary(&[("sku", HostValue::from("MOON-2"))])).unwrap();
    assert!(!equals(&a, &b));
}

#[test]
fn test_default_key_paths_are_all_properties() {
    assert_eq!(
        equality_key_paths::<Plain>(),
        vec!["a".to_string(), "b".to_string()]
    );
    let a = Model::<Plain>::shared(&dictionary(&[("a", 1.into()), ("b", 2.into())])).unwrap();
    let b = Model::<Plain>::shared(&dictionary(&[("a", 1.into()), ("b", 2.into())])).unwrap();
    let c = Model::<Plain>::shared(&dictionary(&[("a", 1.into()), ("b", 3.into())])).unwrap();
    assert!(equals(&a, &b));
    assert_eq!(hash(&a), hash(&b));
    assert!(!equals(&a, &c));
}

#[test]
fn test_nested_key_path() {
    let price = |amount: i64, currency: &str| {
        HostValue::Mapping(dictionary(&[
            ("amount", HostValue::Integer(amount)),
            ("currency", HostValue::from(currency)),
        ]))
    };
    let a = Model::<Listing>::shared(&dictionary(&[
        ("title", HostValue::from("one")),
        ("price", price(10, "EUR")),
    ]))
    .unwrap();
    let b = Model::<Listing>::shared(&dictionary(&[
        ("title", HostValue::from("two")),
        ("price", price(10, "USD")),
    ]))
    .unwrap();
    let c = Model::<Listing>::shared(&dictionary(&[("price", price(11, "EUR"))])).unwrap();
    assert!(equals(&a, &b));
    assert_eq!(hash(&a), hash(&b));
    assert!(!equals(&a, &c));
}

#[test]
fn test_scripted_overrides() {
    let a = Model::<Cart>::shared(&dictionary(&[("owner", HostValue::from("Ada"))])).unwrap();
    let b = Model::<Cart>::shared(&dictionary(&[
        ("owner", HostValue::from("ADA")),
        ("items", HostValue::Sequence(vec![HostValue::from("lamp")])),
    ]))
    .unwrap();
    let c = Model::<Cart>::shared(&dictionary(&[("owner", HostValue::from("Grace"))])).unwrap();
    assert!(equals(&a, &b));
    assert!(!equals(&a, &c));
    assert_eq!(hash(&a), 3);
    assert_eq!(hash(&c), 5);
}

#[test]
fn test_failing_override_falls_back_to_structure() {
    let a = Model::<Flaky>::shared(&dictionary(&[("id", 1.into()), ("note", "x".into())])).unwrap();
    let b = Model::<Flaky>::shared(&dictionary(&[("id", 1.into()), ("note", "y".into())])).unwrap();
    let c = Model::<Flaky>::shared(&dictionary(&[("id", 2.into())])).unwrap();
    assert!(equals(&a, &b));
    assert!(!equals(&a, &c));
}

#[test]
fn test_host_values_compare_models() {
    let a = Model::<Product>::shared(&dictionary(&[("sku", HostValue::from("S"))])).unwrap();
    let b = Model::<Product>::shared(&dictionary(&[("sku", HostValue::from("S"))])).unwrap();
    assert_eq!(HostValue::object(a), HostValue::object(b));
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn test_scripts_read_properties() {
    let context = ExecutionContext::new().unwrap();
    let product = Model::<Product>::shared(&dictionary(&[
        ("sku", HostValue::from("MOON-3")),
        ("price", decimal("2.50")),
    ]))
    .unwrap();
    context.push_object(&HostValue::object(product));
    context.set_global("product").unwrap();
    context
        .do_string(
            "return product:sku(), product:price(), product:dictionaryValue().sku",
            ResultCount::Exactly(3),
        )
        .unwrap();
    assert_eq!(context.pop::<String>(), Some("MOON-3".to_string()));
    assert_eq!(context.pop::<String>(), Some("2.50".to_string()));
    assert_eq!(context.pop::<String>(), Some("MOON-3".to_string()));
}

#[test]
fn test_scripts_compare_models() {
    let context = ExecutionContext::new().unwrap();
    let make = |name: &str| {
        Model::<Cart>::shared(&dictionary(&[("owner", HostValue::from(name))])).unwrap()
    };
    context.push_object(&HostValue::object(make("ada")));
    context.set_global("a").unwrap();
    context.push_object(&HostValue::object(make("Ada")));
    context.set_global("b").unwrap();
    context
        .do_string("return a == b", ResultCount::Exactly(1))
        .unwrap();
    assert_eq!(context.pop::<bool>(), Some(true));
}

// ============================================================================
// Archival
// ============================================================================

#[test]
fn test_archive_revalidates() {
    let archive = r#"{"sku": 12, "name": "bad"}"#;
    let err = Model::<Product>::decode(archive).unwrap_err();
    assert!(matches!(err, BridgeError::Validation { .. }));
}

#[test]
fn test_archived_decimal_is_text_on_decode() {
    let product = Model::<Product>::from_dictionary(&dictionary(&[
        ("sku", HostValue::from("MOON-4")),
        ("price", decimal("0.10")),
    ]))
    .unwrap();
    let archive = product.encode().unwrap();
    assert!(archive.contains(r#""price":"0.10""#));

    // the price comes back as text, which Product rejects
    let err = Model::<Product>::decode(&archive).unwrap_err();
    assert!(matches!(err, BridgeError::Validation { ref key, .. } if key == "price"));
}

#[test]
fn test_archive_round_trip_without_validation() {
    let plain = Model::<Plain>::from_dictionary(&dictionary(&[
        ("a", HostValue::Sequence(vec![1.into(), "two".into()])),
        ("b", HostValue::Bool(true)),
    ]))
    .unwrap();
    let back = Model::<Plain>::decode(&plain.encode().unwrap()).unwrap();
    assert_eq!(back.properties(), plain.properties());
}
