//! Unit tests for the shared bridge types

use core_types::{
    BridgeError, ErrorDomain, Fault, LuaStatus, ScriptSource, Syntax, ValueType,
    EXTENDED_EXTENSION,
};
use std::path::{Path, PathBuf};

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_runtime_error_in_interpreter_domain() {
    let error = BridgeError::runtime("boom");
    assert_eq!(error.domain(), ErrorDomain::Interpreter);
    assert_eq!(error.status(), Some(LuaStatus::Runtime));
    assert_eq!(error.to_string(), "runtime error: boom");
}

#[test]
fn test_memory_error_code() {
    let error = BridgeError::Runtime {
        status: LuaStatus::Memory,
        message: "not enough memory".to_string(),
    };
    assert_eq!(error.code(), Some(4));
}

#[test]
fn test_io_error_domain() {
    let error = BridgeError::Io {
        path: PathBuf::from("missing.lua"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    };
    assert_eq!(error.domain(), ErrorDomain::Io);
    assert!(error.to_string().contains("missing.lua"));
    assert_eq!(error.code(), None);
}

#[test]
fn test_validation_error_message() {
    let error = BridgeError::Validation {
        key: "price".to_string(),
        reason: "must not be negative".to_string(),
    };
    assert_eq!(error.domain(), ErrorDomain::Bridge);
    assert_eq!(
        error.to_string(),
        "invalid value for `price`: must not be negative"
    );
}

// ============================================================================
// Fault Tests
// ============================================================================

#[test]
fn test_stack_overflow_fault_is_a_panic() {
    let payload = std::panic::catch_unwind(|| {
        Fault::StackOverflow {
            requested: 10,
            depth: 5,
            limit: 8,
        }
        .raise()
    })
    .unwrap_err();

    match Fault::from_panic(payload.as_ref()) {
        Some(Fault::StackOverflow { limit, .. }) => assert_eq!(*limit, 8),
        other => panic!("expected stack overflow, got {:?}", other),
    }
}

#[test]
fn test_plain_panics_are_not_faults() {
    let payload = std::panic::catch_unwind(|| panic!("unrelated")).unwrap_err();
    assert!(Fault::from_panic(payload.as_ref()).is_none());
}

// ============================================================================
// Source Tests
// ============================================================================

#[test]
fn test_syntax_extensions() {
    assert_eq!(Syntax::Extended.extension(), EXTENDED_EXTENSION);
    assert_eq!(Syntax::Base.extension(), "lua");
    assert_eq!(Syntax::from_extension("lua"), Some(Syntax::Base));
    assert_eq!(Syntax::from_path(Path::new("dir/Cart.mlua")), Some(Syntax::Extended));
    assert_eq!(Syntax::from_path(Path::new("Cart")), None);
}

#[test]
fn test_named_script_source() {
    let source = ScriptSource::named("x = 1", Syntax::Extended, "=Cart");
    assert_eq!(
        source,
        ScriptSource::Text {
            source: "x = 1".to_string(),
            syntax: Syntax::Extended,
            chunk_name: "=Cart".to_string(),
        }
    );
}

// ============================================================================
// Value Type Tests
// ============================================================================

#[test]
fn test_value_type_defaults_to_any() {
    assert_eq!(ValueType::default(), ValueType::Any);
    assert_eq!(ValueType::Unsigned.to_string(), "unsigned");
}
