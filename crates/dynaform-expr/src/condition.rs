//! Condition expressions: typed predicates over attribute paths.

use std::fmt;
use std::ops;

use dynaform_codec::ToWire;
use dynaform_types::WireValue;

use crate::path::AttributePath;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// The operator as written in expression text.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A predicate over the attributes of one item.
///
/// Conditions are plain data. They are built with [`attr`] and the
/// combinators below, compiled to placeholder text by
/// [`ExpressionCompiler`](crate::ExpressionCompiler), and evaluated against
/// an item by [`Condition::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Compare {
        path: AttributePath,
        op: Comparator,
        value: WireValue,
    },
    Between {
        path: AttributePath,
        low: WireValue,
        high: WireValue,
    },
    BeginsWith {
        path: AttributePath,
        prefix: WireValue,
    },
    /// Substring of a string, member of a set, or element of a list.
    Contains {
        path: AttributePath,
        operand: WireValue,
    },
    AttributeExists(AttributePath),
    AttributeNotExists(AttributePath),
    /// Equal to one of the listed values.
    In {
        path: AttributePath,
        values: Vec<WireValue>,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Conjunction of every condition, or `None` for an empty input.
    pub fn all<I: IntoIterator<Item = Condition>>(conditions: I) -> Option<Condition> {
        conditions.into_iter().reduce(Condition::and)
    }

    /// Disjunction of every condition, or `None` for an empty input.
    pub fn any<I: IntoIterator<Item = Condition>>(conditions: I) -> Option<Condition> {
        conditions.into_iter().reduce(Condition::or)
    }

    /// Every attribute path the condition mentions, in order of appearance.
    pub fn paths(&self) -> Vec<&AttributePath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a AttributePath>) {
        match self {
            Self::Compare { path, .. }
            | Self::Between { path, .. }
            | Self::BeginsWith { path, .. }
            | Self::Contains { path, .. }
            | Self::In { path, .. }
            | Self::AttributeExists(path)
            | Self::AttributeNotExists(path) => out.push(path),
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
            Self::Not(inner) => inner.collect_paths(out),
        }
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

impl ops::BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        self.and(rhs)
    }
}

impl ops::BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        self.or(rhs)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Start a condition on a top-level attribute.
pub fn attr(name: impl Into<String>) -> Attr {
    Attr(AttributePath::name(name))
}

/// Start a condition on an arbitrary path.
pub fn at(path: AttributePath) -> Attr {
    Attr(path)
}

/// The left-hand side of a condition under construction. Operands are
/// encoded with [`ToWire`].
#[derive(Debug, Clone)]
pub struct Attr(AttributePath);

impl Attr {
    fn compare<T: ToWire>(self, op: Comparator, value: T) -> Condition {
        Condition::Compare {
            path: self.0,
            op,
            value: value.to_wire(),
        }
    }

    pub fn eq<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Eq, value)
    }

    pub fn ne<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Ne, value)
    }

    pub fn lt<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Lt, value)
    }

    pub fn le<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Le, value)
    }

    pub fn gt<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Gt, value)
    }

    pub fn ge<T: ToWire>(self, value: T) -> Condition {
        self.compare(Comparator::Ge, value)
    }

    /// Inclusive range.
    pub fn between<T: ToWire>(self, low: T, high: T) -> Condition {
        Condition::Between {
            path: self.0,
            low: low.to_wire(),
            high: high.to_wire(),
        }
    }

    pub fn begins_with<T: ToWire>(self, prefix: T) -> Condition {
        Condition::BeginsWith {
            path: self.0,
            prefix: prefix.to_wire(),
        }
    }

    pub fn contains<T: ToWire>(self, operand: T) -> Condition {
        Condition::Contains {
            path: self.0,
            operand: operand.to_wire(),
        }
    }

    pub fn exists(self) -> Condition {
        Condition::AttributeExists(self.0)
    }

    pub fn not_exists(self) -> Condition {
        Condition::AttributeNotExists(self.0)
    }

    pub fn is_in<T, I>(self, values: I) -> Condition
    where
        T: ToWire,
        I: IntoIterator<Item = T>,
    {
        Condition::In {
            path: self.0,
            values: values.into_iter().map(|value| value.to_wire()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_encodes_operands() {
        assert_eq!(
            attr("age").gt(21u8),
            Condition::Compare {
                path: AttributePath::name("age"),
                op: Comparator::Gt,
                value: WireValue::number(21i64),
            }
        );
        assert_eq!(
            attr("tags").contains("red"),
            Condition::Contains {
                path: AttributePath::name("tags"),
                operand: WireValue::string("red"),
            }
        );
    }

    #[test]
    fn operators_build_trees() {
        let a = attr("a").exists();
        let b = attr("b").not_exists();
        assert_eq!(a.clone() & b.clone(), a.clone().and(b.clone()));
        assert_eq!(a.clone() | b.clone(), Condition::Or(Box::new(a.clone()), Box::new(b)));
        assert_eq!(!a.clone(), Condition::Not(Box::new(a)));
    }

    #[test]
    fn all_and_any_fold_left() {
        assert_eq!(Condition::all(Vec::new()), None);
        let folded = Condition::all([attr("a").eq(1), attr("b").eq(2), attr("c").eq(3)]).unwrap();
        assert_eq!(
            folded,
            attr("a").eq(1).and(attr("b").eq(2)).and(attr("c").eq(3))
        );
        assert!(Condition::any([attr("a").eq(1)]).is_some());
    }

    #[test]
    fn paths_are_listed_in_order() {
        let cond = at(AttributePath::name("x").index(0))
            .eq("v")
            .or(!attr("y").is_in([1, 2]));
        let rendered: Vec<String> = cond.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["x[0]", "y"]);
    }

    #[test]
    fn comparator_symbols() {
        assert_eq!(Comparator::Ne.to_string(), "<>");
        assert_eq!(Comparator::Le.symbol(), "<=");
    }
}
