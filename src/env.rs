// ABOUTME: Environment module for managing variable bindings and lexical scopes

use crate::error::EvalError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lexical scope frame: a name→value map plus an optional link to the
/// enclosing scope. The global environment has no parent. Environments are
/// shared by `Rc` so a closure can outlive the block/call that created it.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    /// Creates a new child environment nested inside `enclosing`.
    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Unconditional insert/overwrite in this frame. Global redefinition and
    /// local redefinition by a second `var` in the same block are both
    /// allowed and overwrite the prior binding.
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up `name` in this frame, then walks `enclosing` recursively.
    pub fn get(&self, name: &Token) -> Result<Value, EvalError> {
        if let Some(value) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(parent) = &self.enclosing {
            return parent.get(name);
        }

        Err(EvalError::UndefinedVariable {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Assigns `value` into the innermost frame that already defines `name`,
    /// walking the `enclosing` chain to find it. Unlike `define`, this never
    /// creates a new binding: a miss is a runtime error.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), EvalError> {
        if self.bindings.borrow().contains_key(&name.lexeme) {
            self.bindings.borrow_mut().insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(parent) = &self.enclosing {
            return parent.assign(name, value);
        }

        Err(EvalError::UndefinedVariable {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }
}
