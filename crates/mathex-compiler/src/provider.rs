//! Function lookup used while building the tree.
//!
//! Providers are consulted in registration order; the first one returning a
//! factory for a name and argument count wins. Host providers registered on
//! the [`crate::CompilerBuilder`] come before [`BuiltinFunctionProvider`].

use mathex_builtins::{find_builtin, Arity, BuiltinFunction, ParamKind, Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::nodes::{ConditionalNode, FunctionNode, Node};

pub type NativeFn = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync>;

/// Builds the node for one call from its already-built argument nodes.
pub type FunctionFactory = Arc<dyn Fn(Vec<Node>) -> Result<Node> + Send + Sync>;

/// A callable referenced from generated code.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub call: NativeFn,
    /// Calls with constant arguments may be evaluated at compile time.
    pub foldable: bool,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, call: NativeFn) -> Self {
        Self {
            name: name.into(),
            call,
            foldable: true,
        }
    }

    pub fn volatile(mut self) -> Self {
        self.foldable = false;
        self
    }

    pub fn from_builtin(builtin: &'static BuiltinFunction) -> Self {
        Self::new(builtin.name, Arc::new(builtin.implementation))
    }

    pub fn same_as(&self, other: &NativeFunction) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("foldable", &self.foldable)
            .finish()
    }
}

pub trait FunctionProvider: Send + Sync {
    /// Case-sensitive lookup by name and argument count.
    fn resolve(&self, name: &str, arity: usize) -> Option<FunctionFactory>;
}

/// Exposes the `inventory`-registered builtins plus `if(cond, a, b)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFunctionProvider;

impl FunctionProvider for BuiltinFunctionProvider {
    fn resolve(&self, name: &str, arity: usize) -> Option<FunctionFactory> {
        if name == "if" && arity == 3 {
            return Some(Arc::new(|mut args: Vec<Node>| {
                let otherwise = args.pop();
                let then = args.pop();
                let condition = args.pop();
                match (condition, then, otherwise) {
                    (Some(c), Some(t), Some(o)) => ConditionalNode::new(c, t, o),
                    _ => Err(crate::CompileError::Internal(
                        "if expects three arguments".to_string(),
                    )),
                }
            }));
        }
        let builtin = find_builtin(name, arity)?;
        Some(Arc::new(move |args: Vec<Node>| {
            let kinds: Vec<ParamKind> = (0..args.len()).map(|i| builtin.param_kind(i)).collect();
            FunctionNode::new(
                NativeFunction::from_builtin(builtin),
                &kinds,
                builtin.return_kind,
                args,
            )
        }))
    }
}

struct TableEntry {
    arity: Arity,
    factory: FunctionFactory,
}

/// Host-filled function table.
#[derive(Default)]
pub struct FunctionTable {
    entries: HashMap<String, Vec<TableEntry>>,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable").field("names", &names).finish()
    }
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native function with positional argument kinds. The last
    /// kind repeats for variadic arities.
    pub fn register<F>(
        &mut self,
        name: &str,
        arity: Arity,
        param_kinds: Vec<ParamKind>,
        return_kind: ValueKind,
        function: F,
    ) -> &mut Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let native = NativeFunction::new(name, Arc::new(function));
        self.register_native(arity, param_kinds, return_kind, native)
    }

    pub fn register_native(
        &mut self,
        arity: Arity,
        param_kinds: Vec<ParamKind>,
        return_kind: ValueKind,
        native: NativeFunction,
    ) -> &mut Self {
        let name = native.name.clone();
        let factory: FunctionFactory = Arc::new(move |args: Vec<Node>| {
            let kinds: Vec<ParamKind> = (0..args.len())
                .map(|i| {
                    param_kinds
                        .get(i)
                        .or(param_kinds.last())
                        .copied()
                        .unwrap_or(ParamKind::Any)
                })
                .collect();
            FunctionNode::new(native.clone(), &kinds, return_kind, args)
        });
        self.register_factory(&name, arity, factory)
    }

    /// Registers a factory that builds an arbitrary node for the call.
    pub fn register_factory(
        &mut self,
        name: &str,
        arity: Arity,
        factory: FunctionFactory,
    ) -> &mut Self {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(TableEntry { arity, factory });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FunctionProvider for FunctionTable {
    fn resolve(&self, name: &str, arity: usize) -> Option<FunctionFactory> {
        self.entries
            .get(name)?
            .iter()
            .find(|e| e.arity.accepts(arity))
            .map(|e| e.factory.clone())
    }
}

/// Resolves `name` against `providers` in order.
pub fn resolve_function(
    providers: &[Arc<dyn FunctionProvider>],
    name: &str,
    arity: usize,
) -> Option<FunctionFactory> {
    providers.iter().find_map(|p| p.resolve(name, arity))
}
