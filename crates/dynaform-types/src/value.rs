use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeResult;
use crate::number::Number;
use crate::set::NonEmptySet;

/// A whole stored item: attribute names mapped to values.
pub type Item = BTreeMap<String, WireValue>;

/// The primary-key attributes of an item.
pub type Key = Item;

/// One attribute value as the store sends and receives it.
///
/// This is a closed tagged union. The three set variants can never be empty
/// (see [`NonEmptySet`]), and [`Number`] always holds valid decimal text.
///
/// Serializes to the store's attribute JSON, e.g. `{"S": "Amy"}`,
/// `{"N": "12"}`, `{"M": {"name": {"S": "Amy"}}}`, `{"NULL": true}`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "WireRepr", into = "WireRepr")]
pub enum WireValue {
    Str(String),
    Num(Number),
    Bin(Vec<u8>),
    Bool(bool),
    Null,
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
    StrSet(NonEmptySet<String>),
    NumSet(NonEmptySet<Number>),
    BinSet(NonEmptySet<Vec<u8>>),
}

impl WireValue {
    /// The store's type descriptor for this value (`"S"`, `"N"`, `"M"`, ...).
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Str(_) => "S",
            Self::Num(_) => "N",
            Self::Bin(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null => "NULL",
            Self::List(_) => "L",
            Self::Map(_) => "M",
            Self::StrSet(_) => "SS",
            Self::NumSet(_) => "NS",
            Self::BinSet(_) => "BS",
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn number(value: impl Into<Number>) -> Self {
        Self::Num(value.into())
    }

    /// Build a map value from `(name, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, WireValue)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string_set<S, I>(items: I) -> TypeResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        NonEmptySet::try_from_iter(items.into_iter().map(Into::into)).map(Self::StrSet)
    }

    pub fn number_set<I: IntoIterator<Item = Number>>(items: I) -> TypeResult<Self> {
        NonEmptySet::try_from_iter(items).map(Self::NumSet)
    }

    pub fn binary_set<I: IntoIterator<Item = Vec<u8>>>(items: I) -> TypeResult<Self> {
        NonEmptySet::try_from_iter(items).map(Self::BinSet)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Num(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[WireValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, WireValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Take the map out of a `Map` value, handing the value back otherwise.
    pub fn into_map(self) -> Result<Item, Self> {
        match self {
            Self::Map(map) => Ok(map),
            other => Err(other),
        }
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Number> for WireValue {
    fn from(value: Number) -> Self {
        Self::Num(value)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(value: Vec<WireValue>) -> Self {
        Self::List(value)
    }
}

impl From<Item> for WireValue {
    fn from(value: Item) -> Self {
        Self::Map(value)
    }
}

// ---------------------------------------------------------------------------
// Attribute JSON representation
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
enum WireRepr {
    #[serde(rename = "S")]
    Str(String),
    #[serde(rename = "N")]
    Num(Number),
    #[serde(rename = "B")]
    Bin(Vec<u8>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "L")]
    List(Vec<WireValue>),
    #[serde(rename = "M")]
    Map(BTreeMap<String, WireValue>),
    #[serde(rename = "SS")]
    StrSet(NonEmptySet<String>),
    #[serde(rename = "NS")]
    NumSet(NonEmptySet<Number>),
    #[serde(rename = "BS")]
    BinSet(NonEmptySet<Vec<u8>>),
}

impl From<WireRepr> for WireValue {
    fn from(repr: WireRepr) -> Self {
        match repr {
            WireRepr::Str(s) => Self::Str(s),
            WireRepr::Num(n) => Self::Num(n),
            WireRepr::Bin(b) => Self::Bin(b),
            WireRepr::Bool(b) => Self::Bool(b),
            WireRepr::Null(_) => Self::Null,
            WireRepr::List(items) => Self::List(items),
            WireRepr::Map(map) => Self::Map(map),
            WireRepr::StrSet(set) => Self::StrSet(set),
            WireRepr::NumSet(set) => Self::NumSet(set),
            WireRepr::BinSet(set) => Self::BinSet(set),
        }
    }
}

impl From<WireValue> for WireRepr {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Str(s) => Self::Str(s),
            WireValue::Num(n) => Self::Num(n),
            WireValue::Bin(b) => Self::Bin(b),
            WireValue::Bool(b) => Self::Bool(b),
            WireValue::Null => Self::Null(true),
            WireValue::List(items) => Self::List(items),
            WireValue::Map(map) => Self::Map(map),
            WireValue::StrSet(set) => Self::StrSet(set),
            WireValue::NumSet(set) => Self::NumSet(set),
            WireValue::BinSet(set) => Self::BinSet(set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet() -> WireValue {
        WireValue::map([
            ("name", WireValue::string("Amy")),
            ("legs", WireValue::number(4i64)),
            ("tags", WireValue::string_set(["small", "fluffy"]).unwrap()),
        ])
    }

    #[test]
    fn type_tags_match_store_descriptors() {
        assert_eq!(WireValue::string("x").type_tag(), "S");
        assert_eq!(WireValue::number(1i64).type_tag(), "N");
        assert_eq!(WireValue::Null.type_tag(), "NULL");
        assert_eq!(pet().type_tag(), "M");
        assert_eq!(
            WireValue::binary_set([vec![1u8]]).unwrap().type_tag(),
            "BS"
        );
    }

    #[test]
    fn empty_sets_cannot_be_built() {
        assert!(WireValue::string_set(Vec::<String>::new()).is_err());
        assert!(WireValue::number_set(Vec::new()).is_err());
        assert!(WireValue::binary_set(Vec::new()).is_err());
    }

    #[test]
    fn accessors_are_variant_specific() {
        let v = WireValue::string("Amy");
        assert_eq!(v.as_str(), Some("Amy"));
        assert!(v.as_number().is_none());
        assert!(v.as_map().is_none());
        assert_eq!(WireValue::Bool(true).as_bool(), Some(true));
        assert!(WireValue::Null.is_null());
    }

    #[test]
    fn into_map_hands_back_non_maps() {
        assert!(pet().into_map().is_ok());
        assert_eq!(WireValue::Null.into_map(), Err(WireValue::Null));
    }

    #[test]
    fn json_matches_attribute_format() {
        let json = serde_json::to_value(pet()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "M": {
                    "legs": {"N": "4"},
                    "name": {"S": "Amy"},
                    "tags": {"SS": ["fluffy", "small"]}
                }
            })
        );
        assert_eq!(
            serde_json::to_value(WireValue::Null).unwrap(),
            serde_json::json!({"NULL": true})
        );
    }

    #[test]
    fn json_roundtrip() {
        let value = WireValue::List(vec![pet(), WireValue::Null, WireValue::Bin(vec![0, 255])]);
        let text = serde_json::to_string(&value).unwrap();
        let back: WireValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn json_rejects_empty_sets_and_bad_numbers() {
        assert!(serde_json::from_str::<WireValue>(r#"{"SS": []}"#).is_err());
        assert!(serde_json::from_str::<WireValue>(r#"{"N": "twelve"}"#).is_err());
    }
}
