//! Stack depth guarantees across bridge, model and CLI layers

use bridge::{BridgeConfig, ExecutionContext, HostMethods, HostValue, Invocation, ResultCount};
use core_types::{Fault, ValueType};
use integration_tests::dictionary;
use model::{Model, ModelClass};
use moonlit_cli::Runtime;
use rust_decimal::Decimal;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

fn expect_fault<F: FnOnce()>(operation: F) -> Fault {
    let payload = catch_unwind(AssertUnwindSafe(operation)).unwrap_err();
    Fault::from_panic(payload.as_ref())
        .cloned()
        .expect("panic should carry a fault")
}

struct Ledger;

impl ModelClass for Ledger {
    const CLASS_NAME: &'static str = "Ledger";
    const PROPERTY_KEYS: &'static [&'static str] = &["balance", "entries"];

    fn register_methods(methods: &mut HostMethods<Model<Self>>) {
        methods.add("audit", |this, _| bridge::send(this, &Invocation::new("reconcile")));
    }

    fn implementation_source(_: &ExecutionContext) -> Option<core_types::ScriptSource> {
        Some(core_types::ScriptSource::text(
            r#"
            return {
                recurse = function(self, selector) return 1 + self:recurse() end,
                reconcile = function(self) return self:audit() end,
                broken = function() error({ code = 7 }) end,
            }
            "#,
        ))
    }
}

#[test]
fn test_runtime_failures_do_not_leak_stack_slots() {
    let mut runtime = Runtime::new(&BridgeConfig::default()).unwrap();
    for source in ["return 1, 2, 3", "error('x')", "return +", "local t = {} return t"] {
        let _ = runtime.execute_string(source);
        assert_eq!(runtime.context().depth(), 0, "after {:?}", source);
    }
}

#[test]
fn test_marshalled_values_balance_the_stack() {
    let context = ExecutionContext::new().unwrap();
    let price = HostValue::Decimal(Decimal::from_str("12.340").unwrap());
    let nested = HostValue::Mapping(dictionary([
        ("price", price.clone()),
        ("tags", HostValue::Sequence(vec!["a".into(), "b".into()])),
    ]));

    context.enforce_stack_delta(1, |ctx| ctx.push_object(&nested));
    let back = context.enforce_stack_delta(-1, |ctx| ctx.pop_value());
    let back = back.unwrap();
    assert_eq!(
        back.value_at_path("tags"),
        Some(&HostValue::Sequence(vec!["a".into(), "b".into()]))
    );
    assert_eq!(context.depth(), 0);

    context.push(&Decimal::from_str("12.340").unwrap());
    assert_eq!(context.pop::<Decimal>(), price.as_decimal());
}

#[test]
fn test_imbalanced_operation_faults() {
    let context = ExecutionContext::new().unwrap();
    let fault = expect_fault(|| {
        context.enforce_stack_delta(0, |ctx| ctx.push(&1i64));
    });
    assert!(matches!(
        fault,
        Fault::StackImbalance {
            expected: 0,
            actual: 1,
            ..
        }
    ));
}

#[test]
fn test_forwarded_error_value_is_discarded() {
    let ledger = Model::<Ledger>::shared(&dictionary([("balance", HostValue::Integer(10))])).unwrap();
    let result = bridge::forward_invocation(&ledger, &Invocation::new("broken"));
    assert!(result.is_err());
    assert_eq!(bridge::state::<Model<Ledger>>().unwrap().depth(), 0);
}

#[test]
fn test_script_only_recursion_is_a_runtime_error() {
    let ledger = Model::<Ledger>::shared(&dictionary([("balance", HostValue::Integer(0))])).unwrap();
    let result = bridge::forward_invocation(
        &ledger,
        &Invocation::new("recurse").returning(ValueType::Integer),
    );
    // never re-enters the host, so the script alone is at fault
    assert!(result.is_err());
    assert_eq!(bridge::state::<Model<Ledger>>().unwrap().depth(), 0);
}

#[test]
fn test_recursion_through_the_host_is_a_stack_overflow_fault() {
    let ledger = Model::<Ledger>::shared(&dictionary([("balance", HostValue::Integer(0))])).unwrap();
    let fault = expect_fault(|| {
        let _ = bridge::send(&ledger, &Invocation::new("audit"));
    });
    assert!(matches!(fault, Fault::StackOverflow { .. }));
}

#[test]
fn test_small_stack_limit_faults_on_overflow() {
    let config = BridgeConfig {
        max_stack_depth: 4,
        ..BridgeConfig::default()
    };
    let context = ExecutionContext::with_config(&config).unwrap();
    let fault = expect_fault(|| {
        for n in 0..5i64 {
            context.push(&n);
        }
    });
    assert!(matches!(fault, Fault::StackOverflow { limit: 4, .. }));
}

#[test]
fn test_call_results_padded_and_truncated() {
    let context = ExecutionContext::new().unwrap();
    context
        .do_string("return 1, 2, 3", ResultCount::Exactly(2))
        .unwrap();
    assert_eq!(context.depth(), 2);
    assert_eq!(context.pop::<i64>(), Some(2));
    assert_eq!(context.pop::<i64>(), Some(1));

    context.do_string("return 1", ResultCount::Exactly(3)).unwrap();
    assert_eq!(context.depth(), 3);
    context.discard(3);
}
