use mathex_builtins::Value;
use mathex_compiler::{CompileError, Compiler, CompilerConfig, MathDefinition};
use std::sync::Arc;

#[test]
fn identical_text_compiles_once() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    let first = compiler.compile("a+b").unwrap();
    let second = compiler.compile("a+b").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let stats = compiler.stats().unwrap();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.size, 1);
    assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
}

#[test]
fn cache_key_is_the_unmodified_text() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    let tight = compiler.compile("a+b").unwrap();
    let spaced = compiler.compile("a + b").unwrap();
    assert!(!Arc::ptr_eq(&tight, &spaced));
    assert_eq!(compiler.stats().unwrap().compilations, 2);
}

#[test]
fn failures_are_not_cached() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    assert!(compiler.compile("1 +").is_err());
    assert!(compiler.compile("1 +").is_err());
    let stats = compiler.stats().unwrap();
    assert_eq!(stats.compilations, 2);
    assert_eq!(stats.size, 0);
}

#[test]
fn least_used_entry_is_evicted_at_capacity() {
    let config = CompilerConfig {
        cache_capacity: 2,
        ..CompilerConfig::default()
    };
    let compiler = Compiler::builder(MathDefinition::standard())
        .with_config(config)
        .build()
        .unwrap();
    compiler.compile("1 + 1").unwrap();
    compiler.compile("1 + 1").unwrap();
    compiler.compile("1 + 2").unwrap();
    compiler.compile("1 + 3").unwrap();

    let stats = compiler.stats().unwrap();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 2);
    // The frequently used entry survives
    compiler.compile("1 + 1").unwrap();
    assert_eq!(compiler.stats().unwrap().compilations, 3);
}

#[test]
fn clear_empties_the_cache() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    compiler.compile("x").unwrap();
    compiler.clear_cache().unwrap();
    assert_eq!(compiler.stats().unwrap().size, 0);
    compiler.compile("x").unwrap();
    assert_eq!(compiler.stats().unwrap().compilations, 2);
}

#[test]
fn concurrent_requests_share_one_compilation() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| compiler.compile("max(a, b) * 2").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    let stats = compiler.stats().unwrap();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.cache_hits, 15);
    assert_eq!(
        results[0].invoke(&[Value::Int(2), Value::Int(5)]).unwrap(),
        Value::Int(10)
    );
}

#[test]
fn concurrent_requests_for_different_texts() {
    let compiler = Compiler::new(MathDefinition::standard()).unwrap();
    std::thread::scope(|scope| {
        for i in 0..8i64 {
            let compiler = &compiler;
            scope.spawn(move || {
                let text = format!("x + {i}");
                let compiled = compiler.compile(&text).unwrap();
                assert_eq!(compiled.invoke(&[Value::Int(1)]).unwrap(), Value::Int(1 + i));
            });
        }
    });
    assert_eq!(compiler.stats().unwrap().compilations, 8);
}

#[test]
fn process_wide_entry_points_share_a_compiler_per_definition() {
    let definition = MathDefinition::standard();
    let a = mathex_compiler::compiler_for(&definition).unwrap();
    let b = mathex_compiler::compiler_for(&definition).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let compiled = mathex_compiler::compile("n * 3", &definition).unwrap();
    let again = mathex_compiler::compile("n * 3", &definition).unwrap();
    assert!(Arc::ptr_eq(&compiled, &again));
    assert_eq!(
        mathex_compiler::invoke(&compiled, &[Value::Int(2)]).unwrap(),
        Value::Int(6)
    );

    let mut other = MathDefinition::standard();
    other.separator = ";".into();
    let c = mathex_compiler::compiler_for(&other).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn contention_is_retryable() {
    let err = CompileError::Contention {
        waited: std::time::Duration::from_millis(5),
    };
    assert!(err.is_retryable());
    assert!(!CompileError::Internal("x".into()).is_retryable());
}
