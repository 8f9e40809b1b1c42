use mathex_builtins::Value;
use mathex_compiler::extract::{
    extract_function_calls, extract_literals, LiteralExtractor, ScientificNotationExtractor,
    StringLiteralExtractor,
};
use mathex_compiler::symbols::PlaceholderAllocator;
use mathex_compiler::{ConstantRegistry, MathDefinition, ParameterRegistry, SymbolTable};
use std::sync::Arc;
use std::time::Duration;

fn extract(text: &str) -> (SymbolTable, ConstantRegistry, ParameterRegistry) {
    let definition = MathDefinition::standard();
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let parameters = ParameterRegistry::new(Duration::from_secs(1));
    let mut symbols = SymbolTable::with_root(text);
    extract_function_calls(
        &mut symbols,
        &mut constants,
        &mut names,
        &parameters,
        &definition,
        100,
    )
    .unwrap();
    (symbols, constants, parameters)
}

fn expression(symbols: &SymbolTable, name: &str) -> String {
    symbols.get(name).unwrap().expression.clone()
}

#[test]
fn nested_calls_are_hoisted_innermost_first() {
    let (symbols, constants, parameters) = extract("max(min(a, b), c) + sqrt(4)");

    assert_eq!(expression(&symbols, "$0"), "$2 + $4");
    assert_eq!(expression(&symbols, "$1"), "min(a,b)");
    assert_eq!(expression(&symbols, "$2"), "max($1,c)");
    assert_eq!(expression(&symbols, "$4"), "sqrt($3)");
    assert!(symbols.get("$1").unwrap().is_function_call);

    assert_eq!(constants.get("$3").unwrap().value, Value::Int(4));
    let names: Vec<String> = parameters.contexts().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn extraction_reaches_a_fixpoint() {
    let definition = MathDefinition::standard();
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let parameters = ParameterRegistry::new(Duration::from_secs(1));
    let mut symbols = SymbolTable::with_root("abs((x - 1) * (y + 2)) / ((x))");

    for _ in 0..2 {
        extract_function_calls(
            &mut symbols,
            &mut constants,
            &mut names,
            &parameters,
            &definition,
            100,
        )
        .unwrap();
    }
    let first: Vec<_> = symbols.symbols().cloned().collect();
    extract_function_calls(
        &mut symbols,
        &mut constants,
        &mut names,
        &parameters,
        &definition,
        100,
    )
    .unwrap();
    let second: Vec<_> = symbols.symbols().cloned().collect();
    assert_eq!(first, second);
    assert!(second.iter().all(|s| !s.expression.contains('(') || s.is_function_call));
}

#[test]
fn identical_groups_share_one_symbol() {
    let (symbols, _, _) = extract("(a + b) * (a + b)");
    assert_eq!(expression(&symbols, "$0"), "$1 * $1");
    assert_eq!(symbols.len(), 2);
}

#[test]
fn redundant_parentheses_collapse() {
    let (symbols, _, _) = extract("((x))");
    assert_eq!(expression(&symbols, "$0"), "x");
}

#[test]
fn placeholder_is_not_glued_to_a_following_digit() {
    let definition = MathDefinition::standard();
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let extractors: Vec<Arc<dyn LiteralExtractor>> = vec![
        Arc::new(StringLiteralExtractor::new(definition.string_delimiter.clone())),
        Arc::new(ScientificNotationExtractor),
    ];
    let text = extract_literals("\"a\"5", &extractors, &mut constants, &mut names);
    assert_eq!(text, "$1 5");
}

#[test]
fn strings_are_extracted_before_scientific_literals() {
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let extractors: Vec<Arc<dyn LiteralExtractor>> = vec![
        Arc::new(StringLiteralExtractor::new("\"")),
        Arc::new(ScientificNotationExtractor),
    ];
    let text = extract_literals("\"2e5\" + 1.5e3", &extractors, &mut constants, &mut names);
    assert_eq!(text, "$1 + $2");
    assert_eq!(constants.get("$1").unwrap().value, Value::String("2e5".into()));
    assert_eq!(constants.get("$2").unwrap().value, Value::Num(1500.0));
}

#[test]
fn doubled_delimiter_is_an_escape() {
    let extractor = StringLiteralExtractor::new("\"");
    let literal = extractor.next_literal("x + \"say \"\"hi\"\"\"", 0).unwrap();
    assert_eq!(literal.value, Value::String("say \"hi\"".into()));
    assert_eq!(literal.range, 4..16);
}

#[test]
fn unterminated_string_is_left_alone() {
    let extractor = StringLiteralExtractor::new("\"");
    assert!(extractor.next_literal("\"open", 0).is_none());
}

#[test]
fn repeated_literal_text_shares_a_constant() {
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let extractors: Vec<Arc<dyn LiteralExtractor>> = vec![Arc::new(StringLiteralExtractor::new("'"))];
    let text = extract_literals("'a' + 'a' + 'b'", &extractors, &mut constants, &mut names);
    assert_eq!(text, "$1 + $1 + $2");
    assert_eq!(constants.len(), 2);
}

#[test]
fn empty_call_argument_is_a_parse_error() {
    let definition = MathDefinition::standard();
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let parameters = ParameterRegistry::new(Duration::from_secs(1));
    let mut symbols = SymbolTable::with_root("max(1,,2)");
    let err = extract_function_calls(
        &mut symbols,
        &mut constants,
        &mut names,
        &parameters,
        &definition,
        100,
    )
    .unwrap_err();
    assert!(matches!(err, mathex_compiler::CompileError::Parse { .. }));
}

#[test]
fn pass_budget_is_enforced() {
    let definition = MathDefinition::standard();
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let parameters = ParameterRegistry::new(Duration::from_secs(1));
    let mut symbols = SymbolTable::with_root("f(g(h(x)))");
    let err = extract_function_calls(
        &mut symbols,
        &mut constants,
        &mut names,
        &parameters,
        &definition,
        2,
    )
    .unwrap_err();
    assert!(matches!(err, mathex_compiler::CompileError::Internal(_)));
}

#[test]
fn custom_brackets_and_separator() {
    let mut definition = MathDefinition::standard();
    definition.open_paren = "[".into();
    definition.close_paren = "]".into();
    definition.separator = ";".into();
    definition.validate().unwrap();

    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let parameters = ParameterRegistry::new(Duration::from_secs(1));
    let mut symbols = SymbolTable::with_root("max[a; b * 2]");
    extract_function_calls(
        &mut symbols,
        &mut constants,
        &mut names,
        &parameters,
        &definition,
        100,
    )
    .unwrap();
    assert_eq!(expression(&symbols, "$0"), "$2");
    assert_eq!(expression(&symbols, "$1"), "b * 2");
    assert_eq!(expression(&symbols, "$2"), "max[a;$1]");
}

#[test]
fn literal_extraction_leaves_its_own_output_alone() {
    let mut constants = ConstantRegistry::new();
    let mut names = PlaceholderAllocator::default();
    let extractors: Vec<Arc<dyn LiteralExtractor>> = vec![
        Arc::new(StringLiteralExtractor::new("\"")),
        Arc::new(ScientificNotationExtractor),
    ];
    let once = extract_literals(
        "concat(\"1e3\", x) + 2.5e-1 * \"\"",
        &extractors,
        &mut constants,
        &mut names,
    );
    assert_eq!(once, "concat($1, x) + $3 * $2");
    let (count, allocated) = (constants.len(), names.allocated());

    let twice = extract_literals(&once, &extractors, &mut constants, &mut names);
    assert_eq!(twice, once);
    assert_eq!(constants.len(), count);
    assert_eq!(names.allocated(), allocated);
}
