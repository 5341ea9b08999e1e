//! Update expressions: the actions an update applies to a stored item.

use dynaform_codec::ToWire;
use dynaform_types::WireValue;

use crate::path::AttributePath;

/// One action of an [`UpdateExpression`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateAction {
    /// Overwrite the value at `path`.
    Set { path: AttributePath, value: WireValue },
    /// Write `value` only when `path` holds nothing.
    SetIfNotExists { path: AttributePath, value: WireValue },
    /// Append to the list at `path`, creating it when absent.
    Append {
        path: AttributePath,
        values: Vec<WireValue>,
    },
    /// Numeric addition, or union into a set.
    Add { path: AttributePath, value: WireValue },
    Remove(AttributePath),
    /// Remove the members of `value` from the set at `path`.
    Delete { path: AttributePath, value: WireValue },
}

impl UpdateAction {
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::Set { path, .. }
            | Self::SetIfNotExists { path, .. }
            | Self::Append { path, .. }
            | Self::Add { path, .. }
            | Self::Delete { path, .. }
            | Self::Remove(path) => path,
        }
    }
}

/// An ordered list of update actions. Build one with [`set`], [`add`] and the
/// other constructors, then join them with [`UpdateExpression::and`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UpdateExpression {
    actions: Vec<UpdateAction>,
}

impl UpdateExpression {
    pub fn new(action: UpdateAction) -> Self {
        Self {
            actions: vec![action],
        }
    }

    pub fn and(mut self, other: UpdateExpression) -> Self {
        self.actions.extend(other.actions);
        self
    }

    pub fn actions(&self) -> &[UpdateAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

pub fn set<T: ToWire>(path: impl Into<AttributePath>, value: T) -> UpdateExpression {
    UpdateExpression::new(UpdateAction::Set {
        path: path.into(),
        value: value.to_wire(),
    })
}

pub fn set_if_not_exists<T: ToWire>(path: impl Into<AttributePath>, value: T) -> UpdateExpression {
    UpdateExpression::new(UpdateAction::SetIfNotExists {
        path: path.into(),
        value: value.to_wire(),
    })
}

/// Append one element to a list attribute.
pub fn append<T: ToWire>(path: impl Into<AttributePath>, value: T) -> UpdateExpression {
    append_all(path, [value])
}

/// Append several elements, in order, to a list attribute.
pub fn append_all<T, I>(path: impl Into<AttributePath>, values: I) -> UpdateExpression
where
    T: ToWire,
    I: IntoIterator<Item = T>,
{
    UpdateExpression::new(UpdateAction::Append {
        path: path.into(),
        values: values.into_iter().map(|value| value.to_wire()).collect(),
    })
}

pub fn add<T: ToWire>(path: impl Into<AttributePath>, value: T) -> UpdateExpression {
    UpdateExpression::new(UpdateAction::Add {
        path: path.into(),
        value: value.to_wire(),
    })
}

pub fn remove(path: impl Into<AttributePath>) -> UpdateExpression {
    UpdateExpression::new(UpdateAction::Remove(path.into()))
}

pub fn delete<T: ToWire>(path: impl Into<AttributePath>, value: T) -> UpdateExpression {
    UpdateExpression::new(UpdateAction::Delete {
        path: path.into(),
        value: value.to_wire(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_keeps_action_order() {
        let update = set("name", "Amy").and(remove("nickname")).and(add("visits", 1));
        let paths: Vec<String> = update.actions().iter().map(|a| a.path().to_string()).collect();
        assert_eq!(paths, vec!["name", "nickname", "visits"]);
    }

    #[test]
    fn append_wraps_single_value_in_list() {
        assert_eq!(
            append("log", "x"),
            UpdateExpression::new(UpdateAction::Append {
                path: AttributePath::name("log"),
                values: vec![WireValue::string("x")],
            })
        );
    }

    #[test]
    fn default_is_empty() {
        assert!(UpdateExpression::default().is_empty());
        assert!(!remove("a").is_empty());
    }
}
