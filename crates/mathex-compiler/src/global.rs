//! Process-wide convenience entry points, one [`Compiler`] per distinct
//! [`MathDefinition`].

use mathex_builtins::Value;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::{CompiledExpression, Compiler};
use crate::config::CompilerConfig;
use crate::definition::MathDefinition;
use crate::error::{CompileError, InvokeError, Result};

static COMPILERS: Lazy<Mutex<HashMap<MathDefinition, Arc<Compiler>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The shared compiler for `definition`, created on first use.
pub fn compiler_for(definition: &MathDefinition) -> Result<Arc<Compiler>> {
    let timeout = CompilerConfig::default().lock_timeout;
    let mut compilers = COMPILERS
        .try_lock_for(timeout)
        .ok_or(CompileError::Contention { waited: timeout })?;
    if let Some(existing) = compilers.get(definition) {
        return Ok(existing.clone());
    }
    let compiler = Arc::new(Compiler::new(definition.clone())?);
    compilers.insert(definition.clone(), compiler.clone());
    Ok(compiler)
}

pub fn compile(text: &str, definition: &MathDefinition) -> Result<Arc<CompiledExpression>> {
    compiler_for(definition)?.compile(text)
}

pub fn invoke(
    compiled: &CompiledExpression,
    args: &[Value],
) -> std::result::Result<Value, InvokeError> {
    compiled.invoke(args)
}
