use mathex_builtins::{Value, ValueKind};
use mathex_compiler::{Compiler, InvokeError, MathDefinition};
use std::sync::Arc;

fn compiler() -> Compiler {
    Compiler::new(MathDefinition::standard()).unwrap()
}

#[test]
fn sum_of_two_parameters() {
    let compiled = compiler().compile("a + b").unwrap();
    assert_eq!(
        compiled.invoke(&[Value::Int(3), Value::Int(4)]).unwrap(),
        Value::Int(7)
    );
    assert_eq!(
        compiled.invoke(&[Value::Num(0.5), Value::Int(1)]).unwrap(),
        Value::Num(1.5)
    );
}

#[test]
fn numeric_strings_are_adapted() {
    let compiled = compiler().compile("a * 2").unwrap();
    assert_eq!(compiled.invoke(&[Value::from("21")]).unwrap(), Value::Int(42));
}

#[test]
fn unconvertible_argument_is_a_type_mismatch() {
    let compiled = compiler().compile("a + b").unwrap();
    let err = compiled
        .invoke(&[Value::Int(1), Value::from("abc")])
        .unwrap_err();
    match err {
        InvokeError::TypeMismatch {
            parameter,
            expected,
            ..
        } => {
            assert_eq!(parameter, "b");
            assert_eq!(expected, ValueKind::Numeric);
        }
        other => panic!("unexpected {other:?}"),
    }
    // The expression is still usable afterwards
    assert_eq!(
        compiled.invoke(&[Value::Int(1), Value::Int(1)]).unwrap(),
        Value::Int(2)
    );
}

#[test]
fn wrong_argument_count() {
    let compiled = compiler().compile("a + b").unwrap();
    assert_eq!(
        compiled.invoke(&[Value::Int(1)]).unwrap_err(),
        InvokeError::ArityMismatch {
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn nested_calls_evaluate_in_dependency_order() {
    let compiled = compiler().compile("max(min(a, b), c)").unwrap();
    let run = |a: i64, b: i64, c: i64| {
        compiled
            .invoke(&[Value::Int(a), Value::Int(b), Value::Int(c)])
            .unwrap()
    };
    assert_eq!(run(5, 3, 4), Value::Int(4));
    assert_eq!(run(5, 9, 4), Value::Int(5));
    assert_eq!(run(1, 2, 0), Value::Int(1));
}

#[test]
fn untaken_branch_is_never_evaluated() {
    let compiled = compiler().compile("if(x > 0, 10 % x, -1)").unwrap();
    assert_eq!(compiled.invoke(&[Value::Int(0)]).unwrap(), Value::Int(-1));
    assert_eq!(compiled.invoke(&[Value::Int(3)]).unwrap(), Value::Int(1));

    let eager = compiler().compile("10 % x").unwrap();
    assert!(matches!(
        eager.invoke(&[Value::Int(0)]),
        Err(InvokeError::Evaluation(_))
    ));
}

#[test]
fn shared_binding_is_computed_once_per_call() {
    let compiled = compiler().compile("(a + 1) * (a + 1)").unwrap();
    assert_eq!(compiled.program().binding_entries.len(), 1);
    assert_eq!(compiled.invoke(&[Value::Int(2)]).unwrap(), Value::Int(9));
}

#[test]
fn boolean_and_string_parameters() {
    let compiled = compiler().compile("if(flag, count * 2, 0)").unwrap();
    assert_eq!(
        compiled.invoke(&[Value::Bool(true), Value::Int(5)]).unwrap(),
        Value::Int(10)
    );
    assert_eq!(
        compiled.invoke(&[Value::from("false"), Value::from("5")]).unwrap(),
        Value::Int(0)
    );

    let greeting = compiler().compile("upper(name) + \"!\"").unwrap();
    assert_eq!(
        greeting.invoke(&[Value::from("bob")]).unwrap(),
        Value::from("BOB!")
    );
}

#[test]
fn integer_parameters_reject_fractions() {
    let compiled = compiler().compile("x << 2").unwrap();
    assert_eq!(compiled.invoke(&[Value::Num(3.0)]).unwrap(), Value::Int(12));
    assert!(matches!(
        compiled.invoke(&[Value::Num(2.5)]),
        Err(InvokeError::TypeMismatch { .. })
    ));
}

#[test]
fn byte_array_parameters() {
    let compiled = compiler().compile("bits # 0b11111111").unwrap();
    assert_eq!(
        compiled.invoke(&[Value::from("0b10101010")]).unwrap(),
        Value::Bytes(vec![0b0101_0101])
    );
}

#[test]
fn builtin_failure_surfaces_as_evaluation_error() {
    let compiled = compiler().compile("substring(s, 2, 10)").unwrap();
    let err = compiled.invoke(&[Value::from("abc")]).unwrap_err();
    assert!(matches!(err, InvokeError::Evaluation(ref m) if m.starts_with("substring")));
    assert_eq!(
        compiled.invoke(&[Value::from("abcdefghijklm")]).unwrap(),
        Value::from("cdefghijkl")
    );
}

#[test]
fn deep_clone_has_independent_registry() {
    let compiled = compiler().compile("x * 2").unwrap();
    let copy = compiled.deep_clone().unwrap();
    assert!(!Arc::ptr_eq(compiled.registry(), copy.registry()));
    assert!(copy.registry().is_frozen().unwrap());
    assert_eq!(copy.parameters(), compiled.parameters());
    assert_eq!(copy.source(), "x * 2");
    assert_eq!(copy.invoke(&[Value::Int(21)]).unwrap(), Value::Int(42));
}

#[test]
fn compiled_expressions_are_shared_across_threads() {
    let compiled = compiler().compile("a * a + 1").unwrap();
    std::thread::scope(|scope| {
        for i in 0..8i64 {
            let compiled = &compiled;
            scope.spawn(move || {
                let out = compiled.invoke(&[Value::Int(i)]).unwrap();
                assert_eq!(out, Value::Int(i * i + 1));
            });
        }
    });
}

#[test]
fn negative_zero_keeps_its_sign() {
    let compiled = compiler().compile("1 / if(a, 0.0, -0.0)").unwrap();
    assert_eq!(
        compiled.invoke(&[Value::Bool(true)]).unwrap(),
        Value::Num(f64::INFINITY)
    );
    assert_eq!(
        compiled.invoke(&[Value::Bool(false)]).unwrap(),
        Value::Num(f64::NEG_INFINITY)
    );
}
