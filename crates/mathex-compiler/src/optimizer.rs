//! Resolves placeholder symbols least-nested first.

use crate::constants::ConstantRegistry;
use crate::error::{CompileError, Result};
use crate::nodes::Node;
use crate::symbols::SymbolTable;

/// An intermediate value computed before the root expression.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub node: Node,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Bindings in evaluation order.
    pub bindings: Vec<Binding>,
    /// Every resolved symbol, folded or bound, in resolution order.
    pub order: Vec<String>,
}

/// Repeatedly resolves every symbol whose text references no other live
/// symbol. A symbol that folds to a constant moves into `constants` under its
/// own name; anything else becomes a binding. Fails with
/// [`CompileError::UnresolvedSymbols`] when a round makes no progress.
pub fn optimize<F>(
    symbols: &mut SymbolTable,
    constants: &mut ConstantRegistry,
    mut parse: F,
) -> Result<Resolution>
where
    F: FnMut(&str, &mut ConstantRegistry, &[Binding]) -> Result<Node>,
{
    let mut resolution = Resolution::default();
    let root = SymbolTable::root_name();

    while symbols.len() > 1 {
        symbols.count_containment();
        let leaves = symbols.leaves();
        if leaves.is_empty() {
            let stuck: Vec<String> = symbols.names().into_iter().filter(|n| *n != root).collect();
            log::warn!("symbol resolution stalled with {stuck:?} outstanding");
            return Err(CompileError::UnresolvedSymbols(stuck));
        }

        for name in leaves {
            let Some(symbol) = symbols.remove(&name) else {
                continue;
            };
            let node = parse(&symbol.expression, constants, &resolution.bindings)?.simplify()?;
            match node {
                Node::Constant(c) => {
                    log::trace!("{name} folded to {}", c.value);
                    constants.insert_resolved(&name, c.value);
                }
                node => {
                    log::trace!("{name} bound as {node}");
                    resolution.bindings.push(Binding {
                        name: name.clone(),
                        node,
                    });
                }
            }
            resolution.order.push(name);
        }
    }
    Ok(resolution)
}
