//! Named parameters and their type commitments.
//!
//! A parameter starts out [`ValueKind::Unknown`] and commits to a concrete
//! kind the first time an operator or function constrains it. Commitments
//! never change afterwards; a conflicting request is a logical-validity
//! error. The numeric refinement (integer or float) is tracked separately
//! and may be set before the coarse kind.

use mathex_builtins::{NumericKind, ValueKind};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{CompileError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NumericRequirement {
    #[default]
    Unset,
    Integer,
    Float,
}

impl NumericRequirement {
    pub fn numeric_kind(self) -> Option<NumericKind> {
        match self {
            NumericRequirement::Unset => None,
            NumericRequirement::Integer => Some(NumericKind::Integer),
            NumericRequirement::Float => Some(NumericKind::Float),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterContext {
    pub name: String,
    /// Position in the invocation argument list.
    pub order: usize,
    pub kind: ValueKind,
    pub numeric: NumericRequirement,
    /// Referenced from a deferred position, such as a conditional branch, so
    /// an invocation may complete without reading it.
    pub functional: bool,
}

#[derive(Debug, Default)]
struct Inner {
    params: Vec<ParameterContext>,
    frozen: bool,
}

impl Inner {
    fn find_mut(&mut self, name: &str) -> Result<&mut ParameterContext> {
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| CompileError::Internal(format!("unknown parameter '{name}'")))
    }
}

/// Parameter table shared by every node of one compiled expression.
#[derive(Debug)]
pub struct ParameterRegistry {
    inner: RwLock<Inner>,
    lock_timeout: Duration,
}

impl ParameterRegistry {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            lock_timeout,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.try_read_for(self.lock_timeout).ok_or_else(|| {
            log::warn!("parameter registry read lock timed out");
            CompileError::Contention {
                waited: self.lock_timeout,
            }
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.try_write_for(self.lock_timeout).ok_or_else(|| {
            log::warn!("parameter registry write lock timed out");
            CompileError::Contention {
                waited: self.lock_timeout,
            }
        })
    }

    /// Returns the existing context for `name` or creates an undetermined one.
    pub fn advertise(&self, name: &str) -> Result<ParameterContext> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.params.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        if inner.frozen {
            return Err(CompileError::Internal(format!(
                "cannot add parameter '{name}' to a frozen registry"
            )));
        }
        let context = ParameterContext {
            name: name.to_string(),
            order: inner.params.len(),
            kind: ValueKind::Unknown,
            numeric: NumericRequirement::Unset,
            functional: false,
        };
        log::trace!("parameter '{name}' advertised at position {}", context.order);
        inner.params.push(context.clone());
        Ok(context)
    }

    pub fn get(&self, name: &str) -> Result<Option<ParameterContext>> {
        Ok(self.read()?.params.iter().find(|p| p.name == name).cloned())
    }

    pub fn kind_of(&self, name: &str) -> Result<ValueKind> {
        Ok(self
            .get(name)?
            .map(|p| p.kind)
            .unwrap_or(ValueKind::Unknown))
    }

    /// Commits `name` to `kind`. Repeating an existing commitment is a no-op.
    pub fn determine(&self, name: &str, kind: ValueKind) -> Result<()> {
        if !kind.is_determined() {
            return Err(CompileError::Internal(format!(
                "cannot commit '{name}' to an unknown kind"
            )));
        }
        let mut inner = self.write()?;
        let frozen = inner.frozen;
        let param = inner.find_mut(name)?;
        if param.kind == kind {
            return Ok(());
        }
        if param.kind.is_determined() {
            return Err(CompileError::validity(format!(
                "parameter '{name}' is {} and cannot be used as {kind}",
                param.kind
            )));
        }
        if frozen {
            return Err(CompileError::Internal(format!(
                "parameter '{name}' changed after code generation"
            )));
        }
        if param.numeric != NumericRequirement::Unset && kind != ValueKind::Numeric {
            return Err(CompileError::validity(format!(
                "parameter '{name}' must be numeric and cannot be used as {kind}"
            )));
        }
        log::trace!("parameter '{name}' determined as {kind}");
        param.kind = kind;
        Ok(())
    }

    pub fn determine_numeric(&self, name: &str) -> Result<()> {
        self.determine(name, ValueKind::Numeric)
    }

    pub fn determine_string(&self, name: &str) -> Result<()> {
        self.determine(name, ValueKind::String)
    }

    pub fn determine_boolean(&self, name: &str) -> Result<()> {
        self.determine(name, ValueKind::Boolean)
    }

    pub fn determine_byte_array(&self, name: &str) -> Result<()> {
        self.determine(name, ValueKind::ByteArray)
    }

    pub fn determine_integer(&self, name: &str) -> Result<()> {
        self.require(name, NumericRequirement::Integer)
    }

    pub fn determine_float(&self, name: &str) -> Result<()> {
        self.require(name, NumericRequirement::Float)
    }

    fn require(&self, name: &str, requirement: NumericRequirement) -> Result<()> {
        let mut inner = self.write()?;
        let frozen = inner.frozen;
        let param = inner.find_mut(name)?;
        if param.numeric == requirement {
            return Ok(());
        }
        if param.numeric != NumericRequirement::Unset {
            return Err(CompileError::validity(format!(
                "parameter '{name}' cannot be both integer and float"
            )));
        }
        if param.kind.is_determined() && param.kind != ValueKind::Numeric {
            return Err(CompileError::validity(format!(
                "parameter '{name}' is {} and has no numeric refinement",
                param.kind
            )));
        }
        if frozen {
            return Err(CompileError::Internal(format!(
                "parameter '{name}' changed after code generation"
            )));
        }
        param.numeric = requirement;
        Ok(())
    }

    /// Marks `name` as consumed lazily. Marking twice is a no-op.
    pub fn determine_functional(&self, name: &str) -> Result<()> {
        let mut inner = self.write()?;
        let frozen = inner.frozen;
        let param = inner.find_mut(name)?;
        if param.functional {
            return Ok(());
        }
        if frozen {
            return Err(CompileError::Internal(format!(
                "parameter '{name}' changed after code generation"
            )));
        }
        log::trace!("parameter '{name}' marked functional");
        param.functional = true;
        Ok(())
    }

    /// Commits every still-undetermined parameter to `kind`.
    pub fn commit_undetermined(&self, kind: ValueKind) -> Result<()> {
        let mut inner = self.write()?;
        for param in inner.params.iter_mut().filter(|p| !p.kind.is_determined()) {
            log::trace!("parameter '{}' defaulted to {kind}", param.name);
            param.kind = kind;
        }
        Ok(())
    }

    /// Contexts in argument order.
    pub fn contexts(&self) -> Result<Vec<ParameterContext>> {
        Ok(self.read()?.params.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.params.len())
    }

    pub fn freeze(&self) -> Result<()> {
        self.write()?.frozen = true;
        Ok(())
    }

    pub fn is_frozen(&self) -> Result<bool> {
        Ok(self.read()?.frozen)
    }

    /// Independent, unfrozen copy with the same commitments.
    pub fn deep_clone(&self) -> Result<ParameterRegistry> {
        let inner = self.read()?;
        Ok(ParameterRegistry {
            inner: RwLock::new(Inner {
                params: inner.params.clone(),
                frozen: false,
            }),
            lock_timeout: self.lock_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ParameterRegistry {
        ParameterRegistry::new(Duration::from_millis(20))
    }

    #[test]
    fn advertise_is_idempotent_and_ordered() {
        let reg = registry();
        assert_eq!(reg.advertise("b").unwrap().order, 0);
        assert_eq!(reg.advertise("a").unwrap().order, 1);
        assert_eq!(reg.advertise("b").unwrap().order, 0);
        assert_eq!(reg.len().unwrap(), 2);
    }

    #[test]
    fn conflicting_commit_is_a_validity_error() {
        let reg = registry();
        reg.advertise("x").unwrap();
        reg.determine_string("x").unwrap();
        reg.determine_string("x").unwrap();
        let err = reg.determine_numeric("x").unwrap_err();
        assert!(matches!(err, CompileError::LogicalValidity(_)));
    }

    #[test]
    fn integer_and_float_requirements_conflict() {
        let reg = registry();
        reg.advertise("n").unwrap();
        reg.determine_integer("n").unwrap();
        assert!(reg.determine_float("n").is_err());
        assert!(reg.determine_boolean("n").is_err());
        reg.determine_numeric("n").unwrap();
    }

    #[test]
    fn commit_undetermined_leaves_committed_kinds() {
        let reg = registry();
        reg.advertise("s").unwrap();
        reg.advertise("u").unwrap();
        reg.determine_string("s").unwrap();
        reg.commit_undetermined(ValueKind::Numeric).unwrap();
        assert_eq!(reg.kind_of("s").unwrap(), ValueKind::String);
        assert_eq!(reg.kind_of("u").unwrap(), ValueKind::Numeric);
    }

    #[test]
    fn functional_flag_is_sticky_and_frozen_with_the_rest() {
        let reg = registry();
        reg.advertise("f").unwrap();
        assert!(!reg.get("f").unwrap().unwrap().functional);
        reg.determine_functional("f").unwrap();
        reg.determine_functional("f").unwrap();
        assert!(reg.get("f").unwrap().unwrap().functional);

        reg.advertise("g").unwrap();
        reg.freeze().unwrap();
        assert!(reg.determine_functional("f").is_ok());
        assert!(matches!(
            reg.determine_functional("g"),
            Err(CompileError::Internal(_))
        ));
    }

    #[test]
    fn frozen_registry_rejects_new_parameters() {
        let reg = registry();
        reg.advertise("x").unwrap();
        reg.freeze().unwrap();
        assert!(reg.advertise("x").is_ok());
        assert!(matches!(reg.advertise("y"), Err(CompileError::Internal(_))));

        let copy = reg.deep_clone().unwrap();
        assert!(!copy.is_frozen().unwrap());
        assert!(copy.advertise("y").is_ok());
    }

    #[test]
    fn held_lock_times_out_as_contention() {
        let reg = registry();
        let _guard = reg.inner.write();
        let err = reg.advertise("x").unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(reg.contexts(), Err(CompileError::Contention { .. })));
    }
}
