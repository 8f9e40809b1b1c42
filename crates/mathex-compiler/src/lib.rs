//! Compiles formula text into typed, cached bytecode.
//!
//! Compilation runs in stages: literals are extracted into constants, call
//! sites and groups are hoisted into placeholder symbols, the symbols are
//! resolved least-nested first into folded constants or bindings, and the
//! root expression is parsed, simplified and lowered to a [`Program`].
//!
//! ```no_run
//! use mathex_compiler::{Compiler, MathDefinition, Value};
//!
//! let compiler = Compiler::new(MathDefinition::standard())?;
//! let sum = compiler.compile("a + b")?;
//! assert_eq!(sum.invoke(&[Value::Int(3), Value::Int(4)]).ok(), Some(Value::Int(7)));
//! # Ok::<(), mathex_compiler::CompileError>(())
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod definition;
pub mod emit;
pub mod error;
pub mod extract;
pub mod formatter;
pub mod global;
pub mod instr;
pub mod nodes;
pub mod ops;
pub mod optimizer;
pub mod parameters;
pub mod parser;
pub mod provider;
pub mod symbols;
pub mod vm;

pub use cache::CacheStats;
pub use compiler::{Analysis, CompiledExpression, Compiler, CompilerBuilder};
pub use config::CompilerConfig;
pub use constants::{ConstantEntry, ConstantRegistry, PassThrough};
pub use definition::{MathDefinition, OperatorSymbols};
pub use emit::{Emitter, Program};
pub use error::{CompileError, InvokeError, Result};
pub use extract::{ExtractedLiteral, LiteralExtractor};
pub use global::{compile, compiler_for, invoke};
pub use instr::{BinaryOp, Instr, UnaryOp};
pub use nodes::Node;
pub use optimizer::Binding;
pub use parameters::{NumericRequirement, ParameterContext, ParameterRegistry};
pub use provider::{
    BuiltinFunctionProvider, FunctionFactory, FunctionProvider, FunctionTable, NativeFunction,
};
pub use symbols::{ExpressionSymbol, SymbolTable};

pub use mathex_builtins::{Arity, ParamKind, Value, ValueKind};
