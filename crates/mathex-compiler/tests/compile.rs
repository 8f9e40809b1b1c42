use mathex_builtins::{Value, ValueKind};
use mathex_compiler::{CompileError, Compiler, CompilerConfig, MathDefinition, Node};

fn compiler() -> Compiler {
    Compiler::new(MathDefinition::standard()).unwrap()
}

fn folded(text: &str) -> Value {
    let compiled = compiler().compile(text).unwrap();
    assert!(compiled.parameters().is_empty(), "{text} has parameters");
    compiled
        .root()
        .as_constant()
        .cloned()
        .unwrap_or_else(|| panic!("{text} did not fold: {}", compiled.root()))
}

#[test]
fn constant_arithmetic_folds_at_compile_time() {
    assert_eq!(folded("2*3+4"), Value::Int(10));
    assert_eq!(folded("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(folded("7 / 2"), Value::Num(3.5));
    assert_eq!(folded("7 % 4"), Value::Int(3));
    assert_eq!(folded("1.5e3 + 1"), Value::Num(1501.0));
    assert_eq!(folded("0x10 + 1"), Value::Int(17));
    assert_eq!(folded("&hFF + 1"), Value::Int(256));
    assert_eq!(folded("&h10 * 2"), Value::Int(32));
}

#[test]
fn hex_literal_beyond_int_range_is_a_parse_error() {
    assert_eq!(folded("0x7FFFFFFFFFFFFFFF"), Value::Int(i64::MAX));
    let err = compiler().compile("0xFFFFFFFFFFFFFFFF + 1").unwrap_err();
    assert!(matches!(err, CompileError::Parse { .. }), "{err}");
}

#[test]
fn ampersand_followed_by_a_word_is_still_logical_and() {
    let compiled = compiler().compile("a&hello").unwrap();
    assert_eq!(
        compiled.parameters(),
        vec![
            ("a".to_string(), ValueKind::Boolean),
            ("hello".to_string(), ValueKind::Boolean),
        ]
    );
}

#[test]
fn word_operators_keep_their_grouped_operand_apart() {
    let mut definition = MathDefinition::standard();
    definition.operators.not = "not".into();
    definition.operators.and = "and".into();
    let compiler = Compiler::new(definition).unwrap();

    let negated = compiler.compile("not(a)").unwrap();
    assert_eq!(
        negated.parameters(),
        vec![("a".to_string(), ValueKind::Boolean)]
    );
    assert_eq!(negated.invoke(&[Value::Bool(true)]).unwrap(), Value::Bool(false));

    let both = compiler.compile("x and(y)").unwrap();
    assert_eq!(
        both.parameters(),
        vec![
            ("x".to_string(), ValueKind::Boolean),
            ("y".to_string(), ValueKind::Boolean),
        ]
    );
    assert_eq!(
        both.invoke(&[Value::Bool(true), Value::Bool(true)]).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn builtin_calls_with_constant_arguments_fold() {
    assert_eq!(folded("sqrt(16) + 1"), Value::Num(5.0));
    assert_eq!(folded("max(1, 7, 3)"), Value::Int(7));
    assert_eq!(folded("abs(min(-4, 2))"), Value::Int(4));
    assert_eq!(folded("length(upper(\"abc\"))"), Value::Int(3));
}

#[test]
fn power_binds_tighter_than_unary_minus() {
    assert_eq!(folded("-2^2"), Value::Int(-4));
    assert_eq!(folded("2^-1"), Value::Num(0.5));
    assert_eq!(folded("2^3^2"), Value::Int(512));
}

#[test]
fn operator_precedence_levels() {
    assert_eq!(folded("1 + 2 * 3 = 7"), Value::Bool(true));
    assert_eq!(folded("1 << 2 + 1"), Value::Int(8));
    assert_eq!(folded("1 < 2 & 3 >= 4"), Value::Bool(false));
    assert_eq!(folded("true | false & false"), Value::Bool(true));
    assert_eq!(folded("6 & 3"), Value::Int(2));
    assert_eq!(folded("!false"), Value::Bool(true));
}

#[test]
fn strings_concatenate_and_compare() {
    assert_eq!(folded("\"n=\" + 5"), Value::String("n=5".into()));
    assert_eq!(folded("\"abc\" < \"abd\""), Value::Bool(true));
    assert_eq!(folded("trim(\"  x \") = \"x\""), Value::Bool(true));
}

#[test]
fn named_constants_resolve() {
    assert_eq!(folded("pi = pi"), Value::Bool(true));
    assert_eq!(folded("if(true, 1, 2)"), Value::Int(1));
}

#[test]
fn parameters_follow_textual_order_and_kinds() {
    let compiled = compiler().compile("if(flag, count * 2, 0)").unwrap();
    assert_eq!(
        compiled.parameters(),
        vec![
            ("flag".to_string(), ValueKind::Boolean),
            ("count".to_string(), ValueKind::Numeric),
        ]
    );
    assert_eq!(compiled.return_kind(), ValueKind::Numeric);
    assert!(compiled.registry().is_frozen().unwrap());
}

#[test]
fn conditional_branches_mark_parameters_functional() {
    let compiled = compiler().compile("if(c, a, b) + d").unwrap();
    let functional: Vec<(&str, bool)> = compiled
        .parameter_contexts()
        .iter()
        .map(|p| (p.name.as_str(), p.functional))
        .collect();
    assert_eq!(
        functional,
        vec![("c", false), ("a", true), ("b", true), ("d", false)]
    );
    let copy = compiled.deep_clone().unwrap();
    assert!(copy.parameter_contexts()[1].functional);
}

#[test]
fn string_usage_commits_string_kind() {
    let compiled = compiler().compile("upper(name) + \"!\"").unwrap();
    assert_eq!(
        compiled.parameters(),
        vec![("name".to_string(), ValueKind::String)]
    );
    assert_eq!(compiled.return_kind(), ValueKind::String);
}

#[test]
fn unused_kind_defaults_to_numeric() {
    let compiled = compiler().compile("x").unwrap();
    assert_eq!(compiled.parameters(), vec![("x".to_string(), ValueKind::Numeric)]);
    assert!(matches!(compiled.root(), Node::Parameter(_)));
}

#[test]
fn shifts_require_integer_parameters() {
    let compiled = compiler().compile("x << 2").unwrap();
    let context = &compiled.parameter_contexts()[0];
    assert_eq!(
        context.numeric,
        mathex_compiler::NumericRequirement::Integer
    );
}

#[test]
fn not_over_a_string_is_rejected() {
    let err = compiler().compile("!\"abc\"").unwrap_err();
    assert!(matches!(err, CompileError::LogicalValidity(_)), "{err}");
}

#[test]
fn conflicting_parameter_kinds_are_rejected() {
    let err = compiler().compile("upper(s) + s * 2").unwrap_err();
    assert!(matches!(err, CompileError::LogicalValidity(_)), "{err}");
}

#[test]
fn byte_arrays_do_not_join_strings() {
    let err = compiler().compile("0b1010 + \"x\"").unwrap_err();
    assert!(matches!(err, CompileError::LogicalValidity(_)), "{err}");
}

#[test]
fn float_literal_cannot_feed_an_integer_operator() {
    let err = compiler().compile("1.5 << 2").unwrap_err();
    assert!(matches!(err, CompileError::LogicalValidity(_)), "{err}");
}

#[test]
fn unknown_function_reports_name_and_arity() {
    let err = compiler().compile("nosuch(1, x)").unwrap_err();
    assert_eq!(
        err,
        CompileError::UnresolvedFunction {
            name: "nosuch".into(),
            arity: 2
        }
    );
    let err = compiler().compile("sqrt(1, 2)").unwrap_err();
    assert!(matches!(err, CompileError::UnresolvedFunction { arity: 2, .. }));
}

#[test]
fn malformed_text_is_a_parse_error() {
    for text in ["1 +", "(1 + 2", "", "1 2", "*3"] {
        let err = compiler().compile(text).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }), "{text:?}: {err}");
        assert!(!err.is_retryable());
    }
}

#[test]
fn builder_rejects_invalid_definition_and_config() {
    let mut definition = MathDefinition::standard();
    definition.separator = "(".into();
    assert!(matches!(
        Compiler::new(definition),
        Err(CompileError::InvalidDefinition(_))
    ));

    let config = CompilerConfig {
        max_extraction_passes: 0,
        ..CompilerConfig::default()
    };
    let built = Compiler::builder(MathDefinition::standard())
        .with_config(config)
        .build();
    assert!(matches!(built, Err(CompileError::InvalidDefinition(_))));
}

#[test]
fn analysis_reports_each_stage() {
    let analysis = compiler().analyze("max(min(a, b), c) + 2 + 2").unwrap();
    assert_eq!(analysis.literal_text, "max(min(a, b), c) + 2 + 2");
    assert_eq!(analysis.resolution_order, vec!["$1", "$2"]);
    let bound: Vec<&str> = analysis.bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(bound, vec!["$1", "$2"]);
    assert_eq!(analysis.root.to_string(), "(($2 + 2) + 2)");
    assert_eq!(
        analysis.constants.entries().filter(|c| c.source.as_deref() == Some("2")).count(),
        1
    );
    let names: Vec<&str> = analysis.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn analysis_folds_constant_symbols() {
    let analysis = compiler().analyze("sqrt(4) + 1").unwrap();
    assert!(analysis.bindings.is_empty());
    assert_eq!(analysis.resolution_order, vec!["$2"]);
    assert_eq!(analysis.root.as_constant(), Some(&Value::Num(3.0)));
    assert_eq!(
        analysis.constants.get("$2").map(|c| c.value.clone()),
        Some(Value::Num(2.0))
    );
}

#[test]
fn program_lists_binding_segments_before_the_root() {
    let compiled = compiler().compile("max(min(a, b), c)").unwrap();
    let program = compiled.program();
    assert_eq!(program.binding_entries.len(), 2);
    assert_eq!(program.parameter_count, 3);
    assert!(program.binding_entries.iter().all(|e| *e < program.entry));
    let listing = program.disassemble();
    assert!(listing.contains("binding 0:"));
    assert!(listing.contains("root:"));
    assert!(listing.contains("; min"));
}
