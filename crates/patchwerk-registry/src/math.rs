//! Binary arithmetic nodes: `+`, `-`, `*`, `/`.
//!
//! The left inlet is hot: a number stores the left operand and outputs the
//! result, `bang` outputs it again. The right inlet is cold and only stores
//! the right operand, which defaults to the creation argument.

use patchwerk_core::{Atom, Builder, Context, InletKind, Object, OutletKind};

/// Operation performed by an arithmetic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `left + right`
    Add,
    /// `left - right`
    Subtract,
    /// `left * right`
    Multiply,
    /// `left / right`, zero when `right` is zero
    Divide,
}

impl Operator {
    /// Node name of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        }
    }

    /// Applies the operator. The result is an integer when both operands
    /// are integers, a float otherwise.
    pub fn apply(self, left: &Atom, right: &Atom) -> Atom {
        if let (Atom::Int(l), Atom::Int(r)) = (left, right) {
            let (l, r) = (*l, *r);
            return Atom::Int(match self {
                Operator::Add => l.wrapping_add(r),
                Operator::Subtract => l.wrapping_sub(r),
                Operator::Multiply => l.wrapping_mul(r),
                Operator::Divide => l.checked_div(r).unwrap_or(0),
            });
        }
        let (l, r) = (left.as_float(), right.as_float());
        Atom::Float(match self {
            Operator::Add => l + r,
            Operator::Subtract => l - r,
            Operator::Multiply => l * r,
            Operator::Divide if r == 0.0 => 0.0,
            Operator::Divide => l / r,
        })
    }
}

struct Arithmetic {
    operator: Operator,
    left: Atom,
    right: Atom,
}

impl Object for Arithmetic {
    fn receive(&mut self, ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool {
        match (inlet, message) {
            (0, [value]) if value.is_number() => {
                self.left = value.clone();
                ctx.send(0, vec![self.operator.apply(&self.left, &self.right)]);
                true
            }
            (0, [selector]) if selector.is_tag("bang") => {
                ctx.send(0, vec![self.operator.apply(&self.left, &self.right)]);
                true
            }
            (1, [value]) if value.is_number() => {
                self.right = value.clone();
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn create(builder: &mut Builder<'_>, operator: Operator) -> Result<Box<dyn Object>, String> {
    let right = match builder.arg(0) {
        Atom::Null => Atom::Int(0),
        value if value.is_number() => value,
        other => return Err(format!("{} expects a number, got \"{other}\"", operator.symbol())),
    };
    builder
        .inlet(InletKind::Hot)
        .inlet(InletKind::Cold)
        .outlet(OutletKind::Data);
    Ok(Box::new(Arithmetic {
        operator,
        left: Atom::Int(0),
        right,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_stay_integers() {
        assert_eq!(Operator::Add.apply(&Atom::Int(3), &Atom::Int(5)), Atom::Int(8));
        assert_eq!(Operator::Subtract.apply(&Atom::Int(3), &Atom::Int(5)), Atom::Int(-2));
        assert_eq!(Operator::Multiply.apply(&Atom::Int(3), &Atom::Int(5)), Atom::Int(15));
        assert_eq!(Operator::Divide.apply(&Atom::Int(7), &Atom::Int(2)), Atom::Int(3));
    }

    #[test]
    fn mixed_operands_give_floats() {
        assert_eq!(Operator::Add.apply(&Atom::Int(1), &Atom::Float(0.5)), Atom::Float(1.5));
        assert_eq!(Operator::Divide.apply(&Atom::Float(1.0), &Atom::Int(4)), Atom::Float(0.25));
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(Operator::Divide.apply(&Atom::Int(7), &Atom::Int(0)), Atom::Int(0));
        assert_eq!(Operator::Divide.apply(&Atom::Float(7.0), &Atom::Float(0.0)), Atom::Float(0.0));
        assert_eq!(Operator::Divide.apply(&Atom::Int(i64::MIN), &Atom::Int(-1)), Atom::Int(0));
    }
}
