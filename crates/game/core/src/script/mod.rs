//! Hook scripting for content-authored features and skills.
//!
//! Scripts are small loop-free expressions compiled once when content loads
//! and evaluated as pure functions of a [`ScriptContext`]. Evaluation counts
//! every visited node against a step budget, so a hook can never stall the
//! simulation. Side effects are returned as [`Effect`]s for the engine to
//! apply.
//!
//! ```text
//! stat(holder, "strength") > 10 ? damage(target, amount * 2, "blunt") : log("too weak")
//! ```

pub mod ast;
pub mod context;
pub mod eval;
pub mod hooks;
pub mod parse;

pub use context::{
    Effect, EffectScope, EntityView, Role, ScriptContext, ScriptOutcome, Value, apply_effects,
    data_key, data_prefix,
};
pub use hooks::{FeatureHook, HookName, HookTable, SkillHook};

use crate::error::{ErrorSeverity, GameError};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{function}` takes {min}..={max} arguments, got {got}")]
    Arity {
        function: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("`{operation}` cannot take a {found}")]
    Type {
        operation: String,
        found: &'static str,
    },

    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("step budget of {0} exceeded")]
    BudgetExceeded(u32),
}

impl ScriptError {
    /// Compile-time errors, as opposed to failures while running.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::UnknownVariable(_)
                | Self::UnknownFunction(_)
                | Self::Arity { .. }
        )
    }
}

impl GameError for ScriptError {
    fn severity(&self) -> ErrorSeverity {
        if self.is_compile_error() {
            ErrorSeverity::Validation
        } else {
            ErrorSeverity::Internal
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SCRIPT_SYNTAX",
            Self::UnknownVariable(_) => "SCRIPT_UNKNOWN_VARIABLE",
            Self::UnknownFunction(_) => "SCRIPT_UNKNOWN_FUNCTION",
            Self::Arity { .. } => "SCRIPT_ARITY",
            Self::Type { .. } => "SCRIPT_TYPE",
            Self::UnknownRole(_) => "SCRIPT_UNKNOWN_ROLE",
            Self::DivisionByZero => "SCRIPT_DIVISION_BY_ZERO",
            Self::BudgetExceeded(_) => "SCRIPT_BUDGET_EXCEEDED",
        }
    }
}

/// A compiled hook body. Equality compares source text.
#[derive(Clone, Debug)]
pub struct Script {
    source: String,
    expr: ast::Expr,
}

impl Script {
    pub fn compile(source: &str) -> Result<Self, ScriptError> {
        let expr = parse::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn run(&self, ctx: &ScriptContext, budget: u32) -> Result<ScriptOutcome, ScriptError> {
        eval::evaluate(&self.expr, ctx, budget)
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Tick;

    #[test]
    fn compile_errors_are_validation_errors() {
        let err = Script::compile("nope(").expect_err("broken");
        assert!(err.is_compile_error());
        assert_eq!(err.severity(), ErrorSeverity::Validation);
    }

    #[test]
    fn scripts_compare_by_source() {
        let a = Script::compile("1+1").expect("compiles");
        let b = Script::compile("1+1").expect("compiles");
        assert_eq!(a, b);
        assert_eq!(
            a.run(&ScriptContext::new(Tick(0)), 10).expect("runs").value,
            Value::Number(2.0)
        );
    }
}
