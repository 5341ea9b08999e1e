//! `Format` for optional values and containers.
//!
//! Absence rule: an optional or empty container in a map entry is left out
//! of the map. Where no entry can be left out (top level, list elements) it is
//! written as `Null`. Reading treats an absent attribute and `Null` alike.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use dynaform_types::WireValue;

use crate::error::ReadError;
use crate::format::{read_list, Format};
use crate::Accumulator;

impl<T: Format> Format for Option<T> {
    fn write(&self) -> WireValue {
        match self {
            Some(value) => value.write(),
            None => WireValue::Null,
        }
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        if wire.is_null() {
            Ok(None)
        } else {
            T::read(wire).map(Some)
        }
    }

    fn write_field(&self) -> Option<WireValue> {
        self.as_ref().and_then(T::write_field)
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<T: Format> Format for Box<T> {
    fn write(&self) -> WireValue {
        (**self).write()
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        T::read(wire).map(Box::new)
    }

    fn write_field(&self) -> Option<WireValue> {
        (**self).write_field()
    }

    fn absent() -> Option<Self> {
        T::absent().map(Box::new)
    }
}

/// Ordered sequences are always lists, whatever the element type.
impl<T: Format> Format for Vec<T> {
    fn write(&self) -> WireValue {
        WireValue::List(self.iter().map(Format::write).collect())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_list(wire)
    }
}

impl<T: Format + Ord> Format for BTreeSet<T> {
    fn write(&self) -> WireValue {
        let items: Vec<&T> = self.iter().collect();
        T::write_set(&items)
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        T::read_set(wire).map(|items| items.into_iter().collect())
    }

    fn write_field(&self) -> Option<WireValue> {
        if self.is_empty() {
            None
        } else {
            Some(self.write())
        }
    }

    fn absent() -> Option<Self> {
        Some(BTreeSet::new())
    }
}

impl<T: Format + Eq + Hash> Format for HashSet<T> {
    fn write(&self) -> WireValue {
        let items: Vec<&T> = self.iter().collect();
        T::write_set(&items)
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        T::read_set(wire).map(|items| items.into_iter().collect())
    }

    fn write_field(&self) -> Option<WireValue> {
        if self.is_empty() {
            None
        } else {
            Some(self.write())
        }
    }

    fn absent() -> Option<Self> {
        Some(HashSet::new())
    }
}

fn write_entries<'a, T, I>(entries: I) -> WireValue
where
    T: Format + 'a,
    I: Iterator<Item = (&'a String, &'a T)>,
{
    WireValue::Map(
        entries
            .filter_map(|(key, value)| value.write_field().map(|wire| (key.clone(), wire)))
            .collect(),
    )
}

fn read_entries<T: Format>(wire: &WireValue) -> Result<Vec<(String, T)>, ReadError> {
    let map = wire
        .as_map()
        .ok_or_else(|| ReadError::no_property_of_type("M", wire))?;
    let mut acc = Accumulator::new();
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        if let Some(decoded) = acc.check(key.as_str(), T::read(value)) {
            out.push((key.clone(), decoded));
        }
    }
    acc.into_result().map(|()| out)
}

impl<T: Format> Format for BTreeMap<String, T> {
    fn write(&self) -> WireValue {
        write_entries(self.iter())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_entries(wire).map(|entries| entries.into_iter().collect())
    }
}

impl<T: Format> Format for HashMap<String, T> {
    fn write(&self) -> WireValue {
        write_entries(self.iter())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_entries(wire).map(|entries| entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use dynaform_types::Number;

    #[test]
    fn option_omits_in_field_position_and_writes_null_elsewhere() {
        let none: Option<i32> = None;
        assert_eq!(none.write_field(), None);
        assert_eq!(none.write(), WireValue::Null);
        assert_eq!(Some(5).write_field(), Some(WireValue::number(5i64)));
    }

    #[test]
    fn option_reads_null_as_none_and_propagates_failures() {
        assert_eq!(Option::<i32>::read(&WireValue::Null), Ok(None));
        assert_eq!(Option::<i32>::read(&WireValue::number(7i64)), Ok(Some(7)));
        assert!(Option::<i32>::read(&WireValue::string("x")).is_err());
        assert_eq!(Option::<i32>::absent(), Some(None));
    }

    #[test]
    fn list_of_options_keeps_positions() {
        let values = vec![Some(1), None, Some(3)];
        let wire = values.write();
        assert_eq!(
            wire,
            WireValue::List(vec![
                WireValue::number(1i64),
                WireValue::Null,
                WireValue::number(3i64)
            ])
        );
        assert_eq!(Vec::<Option<i32>>::read(&wire), Ok(values));
    }

    #[test]
    fn vec_of_strings_is_a_list_not_a_set() {
        let wire = vec!["b".to_string(), "a".to_string(), "b".to_string()].write();
        assert_eq!(wire.type_tag(), "L");
    }

    #[test]
    fn scalar_sets_use_typed_set_tags() {
        let strings = BTreeSet::from(["x".to_string(), "y".to_string()]);
        assert_eq!(strings.write().type_tag(), "SS");
        let numbers = HashSet::from([1u32, 2, 3]);
        assert_eq!(numbers.write().type_tag(), "NS");
        let blobs = BTreeSet::from([Bytes::from_static(b"a")]);
        assert_eq!(blobs.write().type_tag(), "BS");
        let lists = BTreeSet::from([vec![1i32], vec![2]]);
        assert_eq!(lists.write().type_tag(), "L");
    }

    #[test]
    fn sets_roundtrip_without_order() {
        let numbers = HashSet::from([10i64, -2, 7]);
        assert_eq!(HashSet::<i64>::read(&numbers.write()), Ok(numbers));
        let lists = BTreeSet::from([vec![1i32, 2], vec![3]]);
        assert_eq!(BTreeSet::<Vec<i32>>::read(&lists.write()), Ok(lists));
    }

    #[test]
    fn empty_set_is_omitted_and_reads_back_empty() {
        let empty: BTreeSet<String> = BTreeSet::new();
        assert_eq!(empty.write_field(), None);
        assert_eq!(empty.write(), WireValue::Null);
        assert_eq!(BTreeSet::<String>::absent(), Some(BTreeSet::new()));
        assert_eq!(BTreeSet::<String>::read(&WireValue::Null), Ok(BTreeSet::new()));
    }

    #[test]
    fn number_set_with_out_of_range_member_fails() {
        let wire = WireValue::number_set([Number::from(1i64), Number::from(1000i64)]).unwrap();
        let err = BTreeSet::<u8>::read(&wire).unwrap_err();
        assert_eq!(err.cases().len(), 1);
        assert_eq!(err.cases()[0].name, "1000");
    }

    #[test]
    fn wrong_set_tag_is_rejected() {
        let wire = WireValue::string_set(["a"]).unwrap();
        assert!(matches!(
            BTreeSet::<i64>::read(&wire),
            Err(ReadError::NoPropertyOfType { expected: "NS", .. })
        ));
    }

    #[test]
    fn maps_drop_absent_entries_and_aggregate_errors() {
        let map = BTreeMap::from([
            ("a".to_string(), Some(1)),
            ("b".to_string(), None),
        ]);
        let wire = map.write();
        assert_eq!(wire, WireValue::map([("a", WireValue::number(1i64))]));

        let bad = WireValue::map([
            ("x", WireValue::number(1i64)),
            ("y", WireValue::string("no")),
            ("z", WireValue::Bool(true)),
        ]);
        let err = HashMap::<String, i32>::read(&bad).unwrap_err();
        assert_eq!(err.cases().len(), 2);
    }

    #[test]
    fn boxed_values_are_transparent() {
        let boxed = Box::new(Some("x".to_string()));
        assert_eq!(boxed.write(), WireValue::string("x"));
        assert_eq!(Box::<Option<String>>::absent(), Some(Box::new(None)));
    }
}
