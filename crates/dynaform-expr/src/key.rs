//! Key conditions for queries: partition-key equality plus an optional
//! sort-key predicate.

use dynaform_codec::ToWire;
use dynaform_types::WireValue;

use crate::condition::{attr, Comparator, Condition};
use crate::path::AttributePath;

/// The key condition of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCondition {
    partition_key: String,
    partition_value: WireValue,
    sort: Option<SortCondition>,
}

/// Predicate on the sort key. `<>` is not allowed on keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortCondition {
    Compare {
        name: String,
        op: Comparator,
        value: WireValue,
    },
    Between {
        name: String,
        low: WireValue,
        high: WireValue,
    },
    BeginsWith {
        name: String,
        prefix: WireValue,
    },
}

/// Match every item whose partition key `name` equals `value`.
pub fn partition<T: ToWire>(name: impl Into<String>, value: T) -> KeyCondition {
    KeyCondition {
        partition_key: name.into(),
        partition_value: value.to_wire(),
        sort: None,
    }
}

/// Start a sort-key predicate.
pub fn sort_key(name: impl Into<String>) -> SortKey {
    SortKey(name.into())
}

impl KeyCondition {
    /// Narrow the query with a sort-key predicate, replacing any previous one.
    pub fn and(mut self, sort: SortCondition) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn partition_value(&self) -> &WireValue {
        &self.partition_value
    }

    pub fn sort(&self) -> Option<&SortCondition> {
        self.sort.as_ref()
    }

    /// The equivalent general condition.
    pub fn to_condition(&self) -> Condition {
        let partition = Condition::Compare {
            path: AttributePath::name(self.partition_key.clone()),
            op: Comparator::Eq,
            value: self.partition_value.clone(),
        };
        match &self.sort {
            Some(sort) => partition.and(sort.to_condition()),
            None => partition,
        }
    }
}

impl SortCondition {
    pub fn name(&self) -> &str {
        match self {
            Self::Compare { name, .. } | Self::Between { name, .. } | Self::BeginsWith { name, .. } => {
                name
            }
        }
    }

    pub fn to_condition(&self) -> Condition {
        match self {
            Self::Compare { name, op, value } => Condition::Compare {
                path: AttributePath::name(name.clone()),
                op: *op,
                value: value.clone(),
            },
            Self::Between { name, low, high } => Condition::Between {
                path: AttributePath::name(name.clone()),
                low: low.clone(),
                high: high.clone(),
            },
            Self::BeginsWith { name, prefix } => attr(name.clone()).begins_with(prefix.clone()),
        }
    }
}

/// The sort-key side of a key condition under construction.
#[derive(Debug, Clone)]
pub struct SortKey(String);

impl SortKey {
    fn compare<T: ToWire>(self, op: Comparator, value: T) -> SortCondition {
        SortCondition::Compare {
            name: self.0,
            op,
            value: value.to_wire(),
        }
    }

    pub fn eq<T: ToWire>(self, value: T) -> SortCondition {
        self.compare(Comparator::Eq, value)
    }

    pub fn lt<T: ToWire>(self, value: T) -> SortCondition {
        self.compare(Comparator::Lt, value)
    }

    pub fn le<T: ToWire>(self, value: T) -> SortCondition {
        self.compare(Comparator::Le, value)
    }

    pub fn gt<T: ToWire>(self, value: T) -> SortCondition {
        self.compare(Comparator::Gt, value)
    }

    pub fn ge<T: ToWire>(self, value: T) -> SortCondition {
        self.compare(Comparator::Ge, value)
    }

    pub fn between<T: ToWire>(self, low: T, high: T) -> SortCondition {
        SortCondition::Between {
            name: self.0,
            low: low.to_wire(),
            high: high.to_wire(),
        }
    }

    pub fn begins_with<T: ToWire>(self, prefix: T) -> SortCondition {
        SortCondition::BeginsWith {
            name: self.0,
            prefix: prefix.to_wire(),
        }
    }
}
