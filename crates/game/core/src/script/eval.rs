//! Tree-walking evaluator with a step budget.

use super::ScriptError;
use super::ast::{BinOp, Expr, Func, UnOp, Var};
use super::context::{Effect, Role, ScriptContext, ScriptOutcome, Value};
use crate::combat::DamageType;

/// Evaluates `expr` against `ctx`, spending one step per node.
pub fn evaluate(expr: &Expr, ctx: &ScriptContext, budget: u32) -> Result<ScriptOutcome, ScriptError> {
    let mut interp = Interpreter {
        ctx,
        budget,
        steps: 0,
        effects: Vec::new(),
    };
    let value = interp.eval(expr)?;
    Ok(ScriptOutcome {
        value,
        effects: interp.effects,
    })
}

struct Interpreter<'a> {
    ctx: &'a ScriptContext,
    budget: u32,
    steps: u32,
    effects: Vec<Effect>,
}

impl Interpreter<'_> {
    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(ScriptError::BudgetExceeded(self.budget));
        }

        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Null => Ok(Value::Null),
            Expr::Var(var) => Ok(self.var(*var)),
            Expr::Unary(op, inner) => {
                let value = self.eval(inner)?;
                match op {
                    UnOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnOp::Neg => Ok(Value::Number(-number("-", &value)?)),
                }
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            Expr::Cond {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call(func, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(*func, &args)
            }
            Expr::Seq(items) => {
                let mut last = Value::Null;
                for item in items {
                    last = self.eval(item)?;
                }
                Ok(last)
            }
        }
    }

    fn var(&self, var: Var) -> Value {
        let ctx = self.ctx;
        match var {
            Var::Tick => Value::Number(ctx.tick.0 as f64),
            Var::Elapsed => ctx.elapsed.map_or(Value::Null, |e| Value::Number(e as f64)),
            Var::Amount => ctx.amount.map_or(Value::Null, |a| Value::Number(a as f64)),
            Var::Hit => ctx.hit.map_or(Value::Null, Value::Bool),
            Var::Interrupted => ctx.interrupted.map_or(Value::Null, Value::Bool),
            Var::Layer => ctx.layer.clone().map_or(Value::Null, Value::Str),
            Var::Args => Value::Number(ctx.args as f64),
            Var::Holder => Value::Str(Role::Holder.to_string()),
            Var::Source => Value::Str(Role::Source.to_string()),
            Var::Target => Value::Str(Role::Target.to_string()),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, ScriptError> {
        // Logical operators short-circuit.
        match op {
            BinOp::And => {
                let left = self.eval(lhs)?;
                return if left.truthy() { self.eval(rhs) } else { Ok(left) };
            }
            BinOp::Or => {
                let left = self.eval(lhs)?;
                return if left.truthy() { Ok(left) } else { self.eval(rhs) };
            }
            _ => {}
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        match op {
            BinOp::Add => match (&left, &right) {
                (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{left}{right}"))),
                _ => Ok(Value::Number(number("+", &left)? + number("+", &right)?)),
            },
            BinOp::Sub => Ok(Value::Number(number("-", &left)? - number("-", &right)?)),
            BinOp::Mul => Ok(Value::Number(number("*", &left)? * number("*", &right)?)),
            BinOp::Div | BinOp::Rem => {
                let (a, b) = (number("/", &left)?, number("/", &right)?);
                if b == 0.0 {
                    return Err(ScriptError::DivisionByZero);
                }
                Ok(Value::Number(if op == BinOp::Div { a / b } else { a % b }))
            }
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::Lt => Ok(Value::Bool(number("<", &left)? < number("<", &right)?)),
            BinOp::Le => Ok(Value::Bool(number("<=", &left)? <= number("<=", &right)?)),
            BinOp::Gt => Ok(Value::Bool(number(">", &left)? > number(">", &right)?)),
            BinOp::Ge => Ok(Value::Bool(number(">=", &left)? >= number(">=", &right)?)),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn call(&mut self, func: Func, args: &[Value]) -> Result<Value, ScriptError> {
        let name = func.as_ref();
        let num = move |i: usize| number(name, &args[i]);
        let text = move |i: usize| {
            args[i].as_str().ok_or(ScriptError::Type {
                operation: name.to_string(),
                found: args[i].type_name(),
            })
        };
        let role = move |i: usize| -> Result<Role, ScriptError> {
            let value = text(i)?;
            value
                .parse()
                .map_err(|_| ScriptError::UnknownRole(value.to_string()))
        };

        match func {
            Func::Min => Ok(Value::Number(num(0)?.min(num(1)?))),
            Func::Max => Ok(Value::Number(num(0)?.max(num(1)?))),
            Func::Abs => Ok(Value::Number(num(0)?.abs())),
            Func::Floor => Ok(Value::Number(num(0)?.floor())),
            Func::Ceil => Ok(Value::Number(num(0)?.ceil())),
            Func::Clamp => {
                let (value, lo, hi) = (num(0)?, num(1)?, num(2)?);
                Ok(Value::Number(value.max(lo).min(hi)))
            }
            Func::Stat => {
                let role = role(0)?;
                let stat = text(1)?;
                Ok(self
                    .ctx
                    .view(role)
                    .and_then(|view| view.stats.get(stat))
                    .map_or(Value::Null, |v| Value::Number(*v as f64)))
            }
            Func::HasTag => Ok(Value::Bool(self.ctx.tags.contains(text(0)?))),
            Func::DamageIs => {
                let wanted = text(0)?;
                let wanted: DamageType = wanted.parse().map_err(|_| ScriptError::Type {
                    operation: name.to_string(),
                    found: "unknown damage type",
                })?;
                Ok(Value::Bool(
                    self.ctx.damage_type.is_some_and(|ty| ty.is(wanted)),
                ))
            }
            Func::HasFeature => {
                let role = role(0)?;
                let id = text(1)?;
                Ok(Value::Bool(
                    self.ctx
                        .view(role)
                        .is_some_and(|view| view.features.contains(id)),
                ))
            }
            Func::Data => Ok(self
                .ctx
                .data
                .get(text(0)?)
                .map_or(Value::Null, |v| Value::Number(*v))),
            Func::Damage => {
                let role = role(0)?;
                let amount = num(1)? as f32;
                let damage_type = match args.get(2) {
                    None | Some(Value::Null) => None,
                    Some(_) => {
                        let ty = text(2)?;
                        Some(ty.parse().map_err(|_| ScriptError::Type {
                            operation: name.to_string(),
                            found: "unknown damage type",
                        })?)
                    }
                };
                self.effects.push(Effect::Damage {
                    role,
                    amount,
                    damage_type,
                });
                Ok(Value::Null)
            }
            Func::Log => {
                self.effects.push(Effect::Log(args[0].to_string()));
                Ok(Value::Null)
            }
            Func::RemoveSelf => {
                self.effects.push(Effect::RemoveSelf);
                Ok(Value::Null)
            }
            Func::SetData => {
                let key = text(0)?.to_string();
                let value = num(1)?;
                self.effects.push(Effect::SetData { key, value });
                Ok(Value::Null)
            }
        }
    }
}

fn number(operation: &str, value: &Value) -> Result<f64, ScriptError> {
    value.as_number().ok_or_else(|| ScriptError::Type {
        operation: operation.to_string(),
        found: value.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::context::EntityView;
    use crate::script::parse::parse;
    use crate::state::{EntityId, Tick};

    fn run(source: &str, ctx: &ScriptContext) -> Result<ScriptOutcome, ScriptError> {
        evaluate(&parse(source).expect("parses"), ctx, 1_000)
    }

    #[test]
    fn arithmetic_and_logic() {
        let ctx = ScriptContext::new(Tick(7)).with_amount(10.0);
        assert_eq!(run("amount * 0.5 + 1", &ctx).expect("runs").value, Value::Number(6.0));
        assert_eq!(run("tick % 2 == 1 && !false", &ctx).expect("runs").value, Value::Bool(true));
        assert_eq!(run("hit ? 1 : 2", &ctx).expect("runs").value, Value::Number(2.0));
        assert_eq!(run("'a' + 1", &ctx).expect("runs").value, Value::Str("a1".into()));
    }

    #[test]
    fn stat_lookup_reads_role_views() {
        let mut view = EntityView {
            id: EntityId(1),
            ..EntityView::default()
        };
        view.stats.insert("strength".into(), 4.0);
        let ctx = ScriptContext::new(Tick(0)).with_view(Role::Holder, view);
        assert_eq!(
            run("stat(holder, 'strength') * 2", &ctx).expect("runs").value,
            Value::Number(8.0)
        );
        assert_eq!(run("stat(target, 'strength')", &ctx).expect("runs").value, Value::Null);
    }

    #[test]
    fn effect_functions_queue_effects() {
        let ctx = ScriptContext::new(Tick(0));
        let outcome = run("damage(target, 3, 'fire'); log('burn'); remove_self()", &ctx)
            .expect("runs");
        assert_eq!(
            outcome.effects,
            vec![
                Effect::Damage {
                    role: Role::Target,
                    amount: 3.0,
                    damage_type: Some(DamageType::Fire),
                },
                Effect::Log("burn".into()),
                Effect::RemoveSelf,
            ]
        );
    }

    #[test]
    fn budget_bounds_evaluation() {
        let ctx = ScriptContext::new(Tick(0));
        let expr = parse("1 + 1 + 1 + 1 + 1").expect("parses");
        assert!(matches!(
            evaluate(&expr, &ctx, 3),
            Err(ScriptError::BudgetExceeded(3))
        ));
        assert!(evaluate(&expr, &ctx, 100).is_ok());
    }

    #[test]
    fn type_errors_surface() {
        let ctx = ScriptContext::new(Tick(0));
        assert!(matches!(run("'x' * 2", &ctx), Err(ScriptError::Type { .. })));
        assert!(matches!(run("1 / 0", &ctx), Err(ScriptError::DivisionByZero)));
        assert!(matches!(
            run("stat('nobody', 'x')", &ctx),
            Err(ScriptError::UnknownRole(_))
        ));
    }

    #[test]
    fn damage_is_follows_hierarchy() {
        let mut ctx = ScriptContext::new(Tick(0));
        ctx.damage_type = Some(DamageType::Slash);
        assert_eq!(run("damage_is('physical')", &ctx).expect("runs").value, Value::Bool(true));
        assert_eq!(run("damage_is('magic')", &ctx).expect("runs").value, Value::Bool(false));
    }
}
