//! Evaluation of expressions against a stored item.

use std::cmp::Ordering;

use dynaform_types::{Item, WireValue};

use crate::condition::{Comparator, Condition};
use crate::error::{EvalError, EvalResult};
use crate::key::KeyCondition;
use crate::path::AttributePath;
use crate::update::{UpdateAction, UpdateExpression};

/// Order two scalars of the same type. Numbers compare by value, strings and
/// binaries bytewise. Anything else is incomparable.
pub fn compare_values(a: &WireValue, b: &WireValue) -> Option<Ordering> {
    match (a, b) {
        (WireValue::Num(x), WireValue::Num(y)) => Some(x.cmp_numeric(y)),
        (WireValue::Str(x), WireValue::Str(y)) => Some(x.cmp(y)),
        (WireValue::Bin(x), WireValue::Bin(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality with numbers compared by value.
pub fn values_equal(a: &WireValue, b: &WireValue) -> bool {
    match (a, b) {
        (WireValue::Num(x), WireValue::Num(y)) => x.cmp_numeric(y).is_eq(),
        _ => a == b,
    }
}

impl Condition {
    /// Whether `item` satisfies the condition. A comparison against a missing
    /// attribute is false, except `<>`, which is true.
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Self::Compare { path, op, value } => {
                let current = path.resolve(item);
                match op {
                    Comparator::Eq => current.is_some_and(|c| values_equal(c, value)),
                    Comparator::Ne => !current.is_some_and(|c| values_equal(c, value)),
                    ordering => current
                        .and_then(|c| compare_values(c, value))
                        .is_some_and(|found| match ordering {
                            Comparator::Lt => found.is_lt(),
                            Comparator::Le => found.is_le(),
                            Comparator::Gt => found.is_gt(),
                            _ => found.is_ge(),
                        }),
                }
            }
            Self::Between { path, low, high } => path.resolve(item).is_some_and(|c| {
                compare_values(c, low).is_some_and(Ordering::is_ge)
                    && compare_values(c, high).is_some_and(Ordering::is_le)
            }),
            Self::BeginsWith { path, prefix } => match (path.resolve(item), prefix) {
                (Some(WireValue::Str(s)), WireValue::Str(p)) => s.starts_with(p.as_str()),
                (Some(WireValue::Bin(b)), WireValue::Bin(p)) => b.starts_with(p),
                _ => false,
            },
            Self::Contains { path, operand } => match (path.resolve(item), operand) {
                (Some(WireValue::Str(s)), WireValue::Str(o)) => s.contains(o.as_str()),
                (Some(WireValue::StrSet(set)), WireValue::Str(o)) => set.contains(o),
                (Some(WireValue::NumSet(set)), WireValue::Num(o)) => {
                    set.iter().any(|n| n.cmp_numeric(o).is_eq())
                }
                (Some(WireValue::BinSet(set)), WireValue::Bin(o)) => set.contains(o),
                (Some(WireValue::List(items)), o) => items.iter().any(|i| values_equal(i, o)),
                _ => false,
            },
            Self::AttributeExists(path) => path.resolve(item).is_some(),
            Self::AttributeNotExists(path) => path.resolve(item).is_none(),
            Self::In { path, values } => path
                .resolve(item)
                .is_some_and(|c| values.iter().any(|v| values_equal(c, v))),
            Self::And(left, right) => left.evaluate(item) && right.evaluate(item),
            Self::Or(left, right) => left.evaluate(item) || right.evaluate(item),
            Self::Not(inner) => !inner.evaluate(item),
        }
    }
}

impl KeyCondition {
    pub fn matches(&self, item: &Item) -> bool {
        self.to_condition().evaluate(item)
    }
}

impl UpdateExpression {
    /// Apply every action in order. On error `item` is left untouched.
    pub fn apply(&self, item: &mut Item) -> EvalResult<()> {
        let mut next = item.clone();
        for action in self.actions() {
            apply_action(action, &mut next)?;
        }
        *item = next;
        Ok(())
    }
}

fn apply_action(action: &UpdateAction, item: &mut Item) -> EvalResult<()> {
    match action {
        UpdateAction::Set { path, value } => path.assign(item, value.clone()),
        UpdateAction::SetIfNotExists { path, value } => {
            if path.resolve(item).is_none() {
                path.assign(item, value.clone())?;
            }
            Ok(())
        }
        UpdateAction::Append { path, values } => match path.resolve(item).cloned() {
            None => path.assign(item, WireValue::List(values.clone())),
            Some(WireValue::List(mut list)) => {
                list.extend(values.iter().cloned());
                path.assign(item, WireValue::List(list))
            }
            Some(other) => Err(EvalError::mismatch(
                "list_append",
                path,
                format!("attribute is {}, not L", other.type_tag()),
            )),
        },
        UpdateAction::Add { path, value } => {
            let updated = add_values(path, path.resolve(item).cloned(), value)?;
            path.assign(item, updated)
        }
        UpdateAction::Remove(path) => path.remove(item).map(|_| ()),
        UpdateAction::Delete { path, value } => {
            let remaining = match (path.resolve(item).cloned(), value) {
                (None, _) => return Ok(()),
                (Some(WireValue::StrSet(a)), WireValue::StrSet(b)) => {
                    a.difference(b).map(WireValue::StrSet)
                }
                (Some(WireValue::NumSet(a)), WireValue::NumSet(b)) => {
                    a.difference(b).map(WireValue::NumSet)
                }
                (Some(WireValue::BinSet(a)), WireValue::BinSet(b)) => {
                    a.difference(b).map(WireValue::BinSet)
                }
                (Some(current), value) => {
                    return Err(EvalError::mismatch(
                        "DELETE",
                        path,
                        format!("cannot delete {} from {}", value.type_tag(), current.type_tag()),
                    ))
                }
            };
            match remaining {
                Some(set) => path.assign(item, set),
                None => path.remove(item).map(|_| ()),
            }
        }
    }
}

fn add_values(
    path: &AttributePath,
    current: Option<WireValue>,
    value: &WireValue,
) -> EvalResult<WireValue> {
    Ok(match (current, value) {
        (None, v)
            if matches!(
                v,
                WireValue::Num(_) | WireValue::StrSet(_) | WireValue::NumSet(_) | WireValue::BinSet(_)
            ) =>
        {
            v.clone()
        }
        (Some(WireValue::Num(a)), WireValue::Num(b)) => WireValue::Num(
            a.checked_add(b)
                .ok_or_else(|| EvalError::mismatch("ADD", path, "sum is not exactly representable"))?,
        ),
        (Some(WireValue::StrSet(a)), WireValue::StrSet(b)) => WireValue::StrSet(a.union(b.clone())),
        (Some(WireValue::NumSet(a)), WireValue::NumSet(b)) => WireValue::NumSet(a.union(b.clone())),
        (Some(WireValue::BinSet(a)), WireValue::BinSet(b)) => WireValue::BinSet(a.union(b.clone())),
        (current, v) => {
            return Err(EvalError::mismatch(
                "ADD",
                path,
                format!(
                    "cannot add {} to {}",
                    v.type_tag(),
                    current.as_ref().map_or("nothing", WireValue::type_tag)
                ),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use dynaform_types::Number;

    use super::*;
    use crate::condition::{at, attr};
    use crate::key::{partition, sort_key};
    use crate::update::{add, append, delete, remove, set, set_if_not_exists};

    fn pet() -> Item {
        Item::from([
            ("name".to_string(), WireValue::string("Amy")),
            ("age".to_string(), WireValue::number(4i64)),
            ("weight".to_string(), WireValue::Num(Number::parse("12.50").unwrap())),
            ("tags".to_string(), WireValue::string_set(["cute", "small"]).unwrap()),
            ("log".to_string(), WireValue::List(vec![WireValue::string("born")])),
            (
                "owner".to_string(),
                WireValue::map([("name", WireValue::string("Sam"))]),
            ),
        ])
    }

    #[test]
    fn comparisons_use_numeric_order() {
        let item = pet();
        assert!(attr("age").gt(3).evaluate(&item));
        assert!(attr("age").lt(10).evaluate(&item));
        assert!(attr("weight").eq(12.5).evaluate(&item));
        assert!(attr("age").between(4, 4).evaluate(&item));
        assert!(!attr("age").gt("3").evaluate(&item));
    }

    #[test]
    fn missing_attributes() {
        let item = pet();
        assert!(!attr("color").eq("red").evaluate(&item));
        assert!(attr("color").ne("red").evaluate(&item));
        assert!(attr("color").not_exists().evaluate(&item));
        assert!(!attr("color").exists().evaluate(&item));
    }

    #[test]
    fn functions_and_membership() {
        let item = pet();
        assert!(attr("name").begins_with("Am").evaluate(&item));
        assert!(attr("tags").contains("cute").evaluate(&item));
        assert!(attr("log").contains("born").evaluate(&item));
        assert!(attr("name").contains("m").evaluate(&item));
        assert!(attr("name").is_in(["Bo", "Amy"]).evaluate(&item));
        assert!(at(AttributePath::parse("owner.name").unwrap()).eq("Sam").evaluate(&item));
    }

    #[test]
    fn boolean_combinators() {
        let item = pet();
        let young = attr("age").lt(5);
        let heavy = attr("weight").gt(100);
        assert!(!(young.clone() & heavy.clone()).evaluate(&item));
        assert!((young.clone() | heavy.clone()).evaluate(&item));
        assert!((!heavy).evaluate(&item));
    }

    #[test]
    fn key_condition_matches() {
        let item = pet();
        assert!(partition("name", "Amy").and(sort_key("age").ge(4)).matches(&item));
        assert!(!partition("name", "Amy").and(sort_key("age").gt(4)).matches(&item));
    }

    #[test]
    fn update_actions_apply_in_order() {
        let mut item = pet();
        set("name", "Bo")
            .and(add("age", 1))
            .and(add("tags", BTreeSet::from(["old".to_string()])))
            .and(delete("tags", BTreeSet::from(["small".to_string()])))
            .and(append("log", "moved"))
            .and(set_if_not_exists("age", 100))
            .and(set_if_not_exists("visits", 0))
            .and(remove("weight"))
            .apply(&mut item)
            .unwrap();

        assert_eq!(item["name"], WireValue::string("Bo"));
        assert_eq!(item["age"], WireValue::number(5i64));
        assert_eq!(item["tags"], WireValue::string_set(["cute", "old"]).unwrap());
        assert_eq!(
            item["log"],
            WireValue::List(vec![WireValue::string("born"), WireValue::string("moved")])
        );
        assert_eq!(item["visits"], WireValue::number(0i64));
        assert!(!item.contains_key("weight"));
    }

    #[test]
    fn add_creates_missing_attributes_and_sums_decimals() {
        let mut item = pet();
        add("count", 2).and(add("weight", 0.25)).apply(&mut item).unwrap();
        assert_eq!(item["count"], WireValue::number(2i64));
        assert!(values_equal(&item["weight"], &WireValue::number(Number::parse("12.75").unwrap())));
    }

    #[test]
    fn add_keeps_decimal_text_exact() {
        let mut item = Item::from([(
            "w".to_string(),
            WireValue::Num(Number::parse("0.1").unwrap()),
        )]);
        add("w", WireValue::Num(Number::parse("0.2").unwrap()))
            .apply(&mut item)
            .unwrap();
        assert_eq!(item["w"], WireValue::Num(Number::parse("0.3").unwrap()));

        let mut big = Item::from([(
            "w".to_string(),
            WireValue::Num(Number::parse("12345678901234567890.5").unwrap()),
        )]);
        add("w", 1).apply(&mut big).unwrap();
        assert_eq!(
            big["w"],
            WireValue::Num(Number::parse("12345678901234567891.5").unwrap())
        );
    }

    #[test]
    fn add_beyond_decimal_precision_fails_and_leaves_the_item() {
        let original = Item::from([(
            "w".to_string(),
            WireValue::Num(Number::parse("0.12345678901234567890123456789012345").unwrap()),
        )]);
        let mut item = original.clone();
        let result = add("w", WireValue::Num(Number::parse("0.5").unwrap())).apply(&mut item);
        assert!(matches!(result, Err(EvalError::TypeMismatch { action: "ADD", .. })));
        assert_eq!(item, original);
    }

    #[test]
    fn deleting_the_last_member_removes_the_attribute() {
        let mut item = pet();
        delete("tags", BTreeSet::from(["cute".to_string(), "small".to_string()]))
            .apply(&mut item)
            .unwrap();
        assert!(!item.contains_key("tags"));
    }

    #[test]
    fn failed_update_leaves_item_untouched() {
        let mut item = pet();
        let before = item.clone();
        let err = set("name", "Bo").and(add("name", 1)).apply(&mut item).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { action: "ADD", .. }));
        assert_eq!(item, before);
    }
}
