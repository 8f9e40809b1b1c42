use mathex_builtins::Value;

use crate::emit::Program;
use crate::error::InvokeError;
use crate::instr::Instr;
use crate::ops;

fn underflow() -> InvokeError {
    InvokeError::Evaluation("stack underflow".to_string())
}

/// Runs `program` with already-adapted positional arguments.
pub fn execute(program: &Program, args: &[Value]) -> Result<Value, InvokeError> {
    if args.len() != program.parameter_count {
        return Err(InvokeError::ArityMismatch {
            expected: program.parameter_count,
            actual: args.len(),
        });
    }
    let mut machine = Machine {
        program,
        args,
        bindings: vec![None; program.binding_entries.len()],
    };
    machine.run(program.entry)
}

struct Machine<'a> {
    program: &'a Program,
    args: &'a [Value],
    bindings: Vec<Option<Value>>,
}

impl Machine<'_> {
    /// Evaluates a binding on first use. Bindings only refer to earlier
    /// slots, so recursion depth is bounded by the binding count.
    fn binding(&mut self, slot: usize) -> Result<Value, InvokeError> {
        if let Some(Some(value)) = self.bindings.get(slot) {
            return Ok(value.clone());
        }
        let entry = *self
            .program
            .binding_entries
            .get(slot)
            .ok_or_else(|| InvokeError::Evaluation(format!("binding {slot} out of range")))?;
        let value = self.run(entry)?;
        self.bindings[slot] = Some(value.clone());
        Ok(value)
    }

    fn run(&mut self, start: usize) -> Result<Value, InvokeError> {
        let program = self.program;
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = start;

        while pc < program.instructions.len() {
            match &program.instructions[pc] {
                Instr::LoadConst(i) => {
                    let value = program.constants.get(*i).ok_or_else(|| {
                        InvokeError::Evaluation(format!("constant {i} out of range"))
                    })?;
                    stack.push(value.clone());
                }
                Instr::LoadParam(i) => {
                    let value = self.args.get(*i).ok_or_else(|| {
                        InvokeError::Evaluation(format!("parameter {i} out of range"))
                    })?;
                    stack.push(value.clone());
                }
                Instr::LoadBinding(i) => {
                    let value = self.binding(*i)?;
                    stack.push(value);
                }
                Instr::Unary(op) => {
                    let value = stack.pop().ok_or_else(underflow)?;
                    stack.push(ops::unary(*op, &value).map_err(InvokeError::Evaluation)?);
                }
                Instr::Binary(op) => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(ops::binary(*op, &a, &b).map_err(InvokeError::Evaluation)?);
                }
                Instr::Call(f, argc) => {
                    let function = program.functions.get(*f).ok_or_else(|| {
                        InvokeError::Evaluation(format!("function {f} out of range"))
                    })?;
                    if stack.len() < *argc {
                        return Err(underflow());
                    }
                    let call_args = stack.split_off(stack.len() - argc);
                    let result = (function.call)(&call_args)
                        .map_err(|e| InvokeError::Evaluation(format!("{}: {e}", function.name)))?;
                    stack.push(result);
                }
                Instr::JumpIfFalse(target) => {
                    let condition = stack.pop().ok_or_else(underflow)?;
                    let truthy = condition.truthy().ok_or_else(|| {
                        InvokeError::Evaluation(format!("condition is not boolean: {condition}"))
                    })?;
                    if !truthy {
                        pc = *target;
                        continue;
                    }
                }
                Instr::Jump(target) => {
                    pc = *target;
                    continue;
                }
                Instr::Return => break,
            }
            pc += 1;
        }

        stack.pop().ok_or_else(underflow)
    }
}
