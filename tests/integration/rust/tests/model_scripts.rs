//! Model classes implemented partly in script files found on the search path

use bridge::{forward_invocation, install_class, responds_to, HostValue, Invocation};
use core_types::{BridgeError, ValueType};
use integration_tests::dictionary;
use model::equality::{equality_key_paths, equals, hash};
use model::{Model, ModelClass};
use std::rc::Rc;
use std::sync::OnceLock;
use tempfile::TempDir;

const INVOICE_SCRIPT: &str = r#"
local Invoice = {}

Invoice.equalityKeyPaths = { "number", "customer.id" }

function Invoice.total(self, selector)
    local sum = 0
    for _, line in ipairs(self:lines()) do
        sum = sum + line.amount * line.quantity
    end
    return sum
end

function Invoice.summary(self, selector, prefix)
    return prefix .. " #" .. self:number()
end

return Invoice
"#;

/// Registers the script directory with the process-wide configuration once.
fn scripts() -> &'static TempDir {
    static SCRIPTS: OnceLock<TempDir> = OnceLock::new();
    SCRIPTS.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Invoice.lua"), INVOICE_SCRIPT).unwrap();
        bridge::add_search_path(dir.path());
        dir
    })
}

struct Invoice;

impl ModelClass for Invoice {
    const CLASS_NAME: &'static str = "Invoice";
    const PROPERTY_KEYS: &'static [&'static str] = &["number", "customer", "lines"];

    fn validate(key: &str, value: &HostValue) -> Result<(), String> {
        match key {
            "number" if value.as_i64().map_or(true, |n| n <= 0) => {
                Err("must be a positive integer".to_string())
            }
            "lines" if value.as_sequence().is_none() => Err("must be a sequence".to_string()),
            _ => Ok(()),
        }
    }
}

fn line(amount: i64, quantity: i64) -> HostValue {
    HostValue::Mapping(dictionary([
        ("amount", HostValue::Integer(amount)),
        ("quantity", HostValue::Integer(quantity)),
    ]))
}

fn customer(id: i64, name: &str) -> HostValue {
    HostValue::Mapping(dictionary([
        ("id", HostValue::Integer(id)),
        ("name", HostValue::from(name)),
    ]))
}

fn invoice(number: i64, customer_value: HostValue, lines: Vec<HostValue>) -> Rc<Model<Invoice>> {
    scripts();
    Model::shared(&dictionary([
        ("number", HostValue::Integer(number)),
        ("customer", customer_value),
        ("lines", HostValue::Sequence(lines)),
    ]))
    .unwrap()
}

#[test]
fn test_script_method_reads_host_properties() {
    let invoice = invoice(7, customer(1, "Ada"), vec![line(10, 2), line(5, 1)]);
    let total = forward_invocation(&invoice, &Invocation::new("total").returning(ValueType::Integer));
    assert_eq!(total.unwrap(), HostValue::Integer(25));

    let summary = forward_invocation(
        &invoice,
        &Invocation::new("summary")
            .with_argument("Invoice")
            .returning(ValueType::Text),
    );
    assert_eq!(summary.unwrap(), HostValue::from("Invoice #7"));
}

#[test]
fn test_responds_to_host_and_script_selectors() {
    let invoice = invoice(1, customer(1, "Ada"), vec![]);
    assert!(responds_to(&invoice, "number"));
    assert!(responds_to(&invoice, "dictionaryValue"));
    assert!(responds_to(&invoice, "total"));
    assert!(!responds_to(&invoice, "refund"));
}

#[test]
fn test_key_paths_come_from_script_file() {
    scripts();
    assert_eq!(
        equality_key_paths::<Invoice>(),
        vec!["number".to_string(), "customer.id".to_string()]
    );

    let a = invoice(3, customer(9, "Ada"), vec![line(1, 1)]);
    let renamed = invoice(3, customer(9, "Ada Lovelace"), vec![line(2, 2)]);
    let other_customer = invoice(3, customer(10, "Ada"), vec![line(1, 1)]);
    let other_number = invoice(4, customer(9, "Ada"), vec![line(1, 1)]);

    assert!(equals(&a, &renamed));
    assert_eq!(hash(&a), hash(&renamed));
    assert!(!equals(&a, &other_customer));
    assert!(!equals(&a, &other_number));
}

#[test]
fn test_equal_models_collapse_in_host_collections() {
    let invoices = vec![
        invoice(1, customer(1, "Ada"), vec![]),
        invoice(1, customer(1, "A. Lovelace"), vec![line(3, 3)]),
        invoice(2, customer(1, "Ada"), vec![]),
    ];
    let mut unique: Vec<HostValue> = Vec::new();
    for invoice in invoices {
        let value = HostValue::object(invoice);
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    assert_eq!(unique.len(), 2);
}

#[test]
fn test_archive_preserves_identity_by_key_paths() {
    let original = invoice(12, customer(4, "Grace"), vec![line(1, 4)]);
    let archive = original.encode().unwrap();
    let restored = Rc::new(Model::<Invoice>::decode(&archive).unwrap());
    assert!(equals(&original, &restored));
    assert_eq!(hash(&original), hash(&restored));
    assert_eq!(
        restored.value_for_key_path("customer.name"),
        Some(&HostValue::from("Grace"))
    );
}

#[test]
fn test_rejected_dictionary_builds_nothing() {
    scripts();
    let err = Model::<Invoice>::from_dictionary(&dictionary([
        ("number", HostValue::Integer(0)),
        ("lines", HostValue::Sequence(vec![])),
    ]))
    .unwrap_err();
    assert!(matches!(err, BridgeError::Validation { ref key, .. } if key == "number"));
}

#[test]
fn test_class_installed_into_explicit_context() {
    let invoice = invoice(5, customer(2, "Lin"), vec![line(4, 4)]);
    let context = bridge::ExecutionContext::new().unwrap();
    install_class::<Model<Invoice>>(&context).unwrap();

    context.push_object(&HostValue::object(invoice));
    context.set_global("invoice").unwrap();
    context
        .do_string(
            "return invoice:total(), invoice:summary('Bill'), invoice:customer().name",
            bridge::ResultCount::Exactly(3),
        )
        .unwrap();
    assert_eq!(context.pop::<String>(), Some("Lin".to_string()));
    assert_eq!(context.pop::<String>(), Some("Bill #5".to_string()));
    assert_eq!(context.pop::<i64>(), Some(16));
    assert_eq!(context.depth(), 0);
}
