use mathex_builtins::Value;
use std::fmt;
use std::fmt::Write as _;

use crate::instr::Instr;
use crate::provider::NativeFunction;

/// Collects instructions and their constant and function tables.
#[derive(Debug, Default)]
pub struct Emitter {
    instructions: Vec<Instr>,
    constants: Vec<Value>,
    functions: Vec<NativeFunction>,
    binding_entries: Vec<usize>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: Instr) -> usize {
        let pc = self.instructions.len();
        self.instructions.push(instr);
        pc
    }

    pub fn patch(&mut self, idx: usize, instr: Instr) {
        if let Some(slot) = self.instructions.get_mut(idx) {
            *slot = instr;
        }
    }

    /// Index the next emitted instruction will have.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    pub fn constant(&mut self, value: &Value) -> usize {
        if let Some(i) = self.constants.iter().position(|c| same_constant(c, value)) {
            return i;
        }
        self.constants.push(value.clone());
        self.constants.len() - 1
    }

    pub fn function(&mut self, function: &NativeFunction) -> usize {
        if let Some(i) = self.functions.iter().position(|f| f.same_as(function)) {
            return i;
        }
        self.functions.push(function.clone());
        self.functions.len() - 1
    }

    /// Starts the segment for the next binding slot and returns the slot.
    pub fn begin_binding(&mut self) -> usize {
        self.binding_entries.push(self.position());
        self.binding_entries.len() - 1
    }

    /// `entry` is where the root segment starts.
    pub fn finish(self, entry: usize, parameter_count: usize) -> Program {
        Program {
            instructions: self.instructions,
            constants: self.constants,
            functions: self.functions,
            binding_entries: self.binding_entries,
            entry,
            parameter_count,
        }
    }
}

/// Immutable executable form of one expression.
///
/// Every binding owns a `Return`-terminated segment starting at its entry in
/// `binding_entries`; the root segment starts at `entry`.
#[derive(Clone)]
pub struct Program {
    pub instructions: Vec<Instr>,
    pub constants: Vec<Value>,
    pub functions: Vec<NativeFunction>,
    pub binding_entries: Vec<usize>,
    pub entry: usize,
    pub parameter_count: usize,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("instructions", &self.instructions)
            .field("constants", &self.constants)
            .field(
                "functions",
                &self.functions.iter().map(|f| &f.name).collect::<Vec<_>>(),
            )
            .field("binding_entries", &self.binding_entries)
            .field("entry", &self.entry)
            .field("parameter_count", &self.parameter_count)
            .finish()
    }
}

/// Pool identity: floats compare by bit pattern so `-0.0` keeps its own slot.
fn same_constant(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl Program {
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (pc, instr) in self.instructions.iter().enumerate() {
            if let Some(slot) = self.binding_entries.iter().position(|e| *e == pc) {
                let _ = writeln!(out, "binding {slot}:");
            } else if pc == self.entry {
                let _ = writeln!(out, "root:");
            }
            let note = match instr {
                Instr::LoadConst(i) => self.constants.get(*i).map(|v| format!("  ; {v}")),
                Instr::Call(i, _) => self.functions.get(*i).map(|f| format!("  ; {}", f.name)),
                _ => None,
            };
            let _ = writeln!(out, "{pc:4}  {instr}{}", note.unwrap_or_default());
        }
        out
    }
}
