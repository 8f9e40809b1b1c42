use mathex_builtins::{ParamKind, Value, ValueKind};
use std::sync::Arc;

use super::{require_float, require_integer, require_kind, Node};
use crate::emit::Emitter;
use crate::error::Result;
use crate::instr::Instr;
use crate::parameters::ParameterRegistry;
use crate::provider::NativeFunction;

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub function: NativeFunction,
    pub args: Vec<Node>,
    pub kind: ValueKind,
}

impl FunctionNode {
    /// Checks each argument against its expected kind. `Integer` and `Float`
    /// also commit the numeric refinement of parameter arguments.
    pub fn new(
        function: NativeFunction,
        param_kinds: &[ParamKind],
        return_kind: ValueKind,
        args: Vec<Node>,
    ) -> Result<Node> {
        for (i, arg) in args.iter().enumerate() {
            let context = format!("argument {} of '{}'", i + 1, function.name);
            let expected = param_kinds
                .get(i)
                .or(param_kinds.last())
                .copied()
                .unwrap_or(ParamKind::Any);
            match expected {
                ParamKind::Any => {}
                ParamKind::Integer => {
                    require_kind(arg, ValueKind::Numeric, &context)?;
                    require_integer(arg, &context)?;
                }
                ParamKind::Float => {
                    require_kind(arg, ValueKind::Numeric, &context)?;
                    require_float(arg)?;
                }
                other => require_kind(arg, other.value_kind(), &context)?,
            }
        }
        Ok(Node::Function(FunctionNode {
            function,
            args,
            kind: return_kind,
        }))
    }

    pub(crate) fn simplify(self) -> Result<Node> {
        let args = self
            .args
            .into_iter()
            .map(Node::simplify)
            .collect::<Result<Vec<_>>>()?;
        if self.function.foldable {
            let constants: Option<Vec<Value>> =
                args.iter().map(|a| a.as_constant().cloned()).collect();
            if let Some(values) = constants {
                match (self.function.call)(&values) {
                    Ok(folded) => return Ok(Node::constant(folded)),
                    Err(e) => log::trace!("left {} unfolded: {e}", self.function.name),
                }
            }
        }
        Ok(Node::Function(FunctionNode {
            function: self.function,
            args,
            kind: self.kind,
        }))
    }

    pub(crate) fn deep_clone(&self, registry: &Arc<ParameterRegistry>) -> Self {
        Self {
            function: self.function.clone(),
            args: self.args.iter().map(|a| a.deep_clone(registry)).collect(),
            kind: self.kind,
        }
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        for arg in &self.args {
            arg.emit(emitter)?;
        }
        let index = emitter.function(&self.function);
        emitter.emit(Instr::Call(index, self.args.len()));
        Ok(())
    }
}
