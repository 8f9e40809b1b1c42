use mathex_builtins::{Value, ValueKind};

use crate::emit::Emitter;
use crate::error::Result;
use crate::instr::Instr;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub value: Value,
}

impl ConstantNode {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        let index = emitter.constant(&self.value);
        emitter.emit(Instr::LoadConst(index));
        Ok(())
    }
}
