use mathex_builtins::ValueKind;
use std::fmt;
use std::sync::Arc;

use crate::emit::Emitter;
use crate::error::{CompileError, Result};
use crate::instr::Instr;
use crate::parameters::ParameterRegistry;

/// Parameter node variant, by committed kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParameterFlavor {
    Undetermined,
    Numeric,
    String,
    Boolean,
    ByteArray,
}

impl From<ValueKind> for ParameterFlavor {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Unknown => ParameterFlavor::Undetermined,
            ValueKind::Numeric => ParameterFlavor::Numeric,
            ValueKind::String => ParameterFlavor::String,
            ValueKind::Boolean => ParameterFlavor::Boolean,
            ValueKind::ByteArray => ParameterFlavor::ByteArray,
        }
    }
}

/// Reference to a named parameter. Its kind lives in the registry, so every
/// node naming the same parameter sees the same commitment.
#[derive(Clone)]
pub struct ParameterNode {
    name: String,
    registry: Arc<ParameterRegistry>,
}

impl fmt::Debug for ParameterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterNode")
            .field("name", &self.name)
            .finish()
    }
}

impl ParameterNode {
    /// Advertises `name` in `registry` and references it.
    pub fn new(name: &str, registry: &Arc<ParameterRegistry>) -> Result<Self> {
        registry.advertise(name)?;
        Ok(Self {
            name: name.to_string(),
            registry: registry.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    pub fn kind(&self) -> Result<ValueKind> {
        self.registry.kind_of(&self.name)
    }

    /// Records that this reference sits in a lazily evaluated position.
    pub fn defer(&self) -> Result<()> {
        self.registry.determine_functional(&self.name)
    }

    pub fn flavor(&self) -> Result<ParameterFlavor> {
        self.kind().map(ParameterFlavor::from)
    }

    pub(crate) fn rebind(&self, registry: &Arc<ParameterRegistry>) -> Self {
        Self {
            name: self.name.clone(),
            registry: registry.clone(),
        }
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        let context = self.registry.get(&self.name)?.ok_or_else(|| {
            CompileError::Internal(format!("parameter '{}' is not registered", self.name))
        })?;
        if ParameterFlavor::from(context.kind) == ParameterFlavor::Undetermined {
            return Err(CompileError::Internal(format!(
                "parameter '{}' reached code generation undetermined",
                self.name
            )));
        }
        emitter.emit(Instr::LoadParam(context.order));
        Ok(())
    }
}

/// Reference to an intermediate binding, evaluated on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingNode {
    pub name: String,
    pub slot: usize,
    pub kind: ValueKind,
}

impl BindingNode {
    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        emitter.emit(Instr::LoadBinding(self.slot));
        Ok(())
    }
}
