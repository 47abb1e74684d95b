//! Syntax tree of the hook expression language.

use std::ops::RangeInclusive;

use strum::{AsRefStr, Display, EnumString};

// ============================================================================
// Expressions
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Str(String),
    Null,
    Var(Var),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : otherwise`
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(Func, Vec<Expr>),
    /// `a; b; c` evaluates each and yields the last.
    Seq(Vec<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

// ============================================================================
// Names
// ============================================================================

/// Context variables readable by scripts. Unset variables read as `null`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Var {
    /// Current board tick.
    Tick,
    /// Ticks since the feature was enabled.
    Elapsed,
    /// Damage amount flowing through a modify hook.
    Amount,
    /// Current hit state in an attack decision chain.
    Hit,
    /// Whether a cancel was forced.
    Interrupted,
    /// Layer an executing skill is running on.
    Layer,
    /// Number of bound skill arguments.
    Args,
    /// Role names, for `stat(holder, "strength")` and friends.
    Holder,
    Source,
    Target,
}

/// Built-in functions. Arity is checked at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Func {
    Min,
    Max,
    Abs,
    Floor,
    Ceil,
    Clamp,
    /// `stat(role, name)`: final stat value, `null` if absent.
    Stat,
    /// `has_tag(tag)`: the skill involved carries `tag`.
    HasTag,
    /// `damage_is(type)`: the damage type is or derives from `type`.
    DamageIs,
    /// `has_feature(role, id)`: the role has an enabled feature `id`.
    HasFeature,
    /// `data(key)`: number stored by `set_data`, `null` if absent.
    Data,
    /// `damage(role, amount[, type])`
    Damage,
    Log,
    RemoveSelf,
    SetData,
}

impl Func {
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Self::RemoveSelf => 0..=0,
            Self::Abs | Self::Floor | Self::Ceil | Self::HasTag | Self::DamageIs => 1..=1,
            Self::Data | Self::Log => 1..=1,
            Self::Min | Self::Max | Self::Stat | Self::HasFeature | Self::SetData => 2..=2,
            Self::Damage => 2..=3,
            Self::Clamp => 3..=3,
        }
    }
}
