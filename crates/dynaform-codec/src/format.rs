//! The [`Format`] trait and its primitive implementations.

use std::collections::BTreeMap;

use bytes::Bytes;
use dynaform_types::{NonEmptySet, Number, WireValue};

use crate::error::ReadError;

/// Canonical wire encoding for a type.
///
/// `Format` is the compile-time half of the codec story: a type implements it
/// once (by hand or through [`derive_format!`](crate::derive_format)), and
/// [`codec`](crate::codec) turns that implementation into an explicit
/// [`Codec`](crate::Codec) value that tables and requests carry around.
///
/// Contract: `T::read(&v.write()) == Ok(v)` for every value, except where the
/// encoding deliberately normalizes (set ordering, empty sets, absent
/// optional fields).
pub trait Format: Sized {
    /// Encode the value.
    fn write(&self) -> WireValue;

    /// Decode a present attribute.
    fn read(wire: &WireValue) -> Result<Self, ReadError>;

    /// Encode the value as a map entry. `None` leaves the attribute out.
    fn write_field(&self) -> Option<WireValue> {
        Some(self.write())
    }

    /// The value an absent attribute decodes to, if absence is acceptable.
    fn absent() -> Option<Self> {
        None
    }

    /// Encode the elements of a set. Scalars override this to produce a
    /// typed set; everything else is written as a list. Empty input writes
    /// `Null`.
    #[doc(hidden)]
    fn write_set(items: &[&Self]) -> WireValue {
        WireValue::List(items.iter().map(|item| item.write()).collect())
    }

    /// Inverse of [`Format::write_set`].
    #[doc(hidden)]
    fn read_set(wire: &WireValue) -> Result<Vec<Self>, ReadError> {
        if wire.is_null() {
            return Ok(Vec::new());
        }
        read_list(wire)
    }
}

/// Encoding-only view of a value, used for expression operands.
///
/// Every [`Format`] type qualifies. String slices are accepted too, so
/// operands can be written as literals.
pub trait ToWire {
    fn to_wire(&self) -> WireValue;
}

impl<T: Format> ToWire for T {
    fn to_wire(&self) -> WireValue {
        self.write()
    }
}

impl ToWire for str {
    fn to_wire(&self) -> WireValue {
        WireValue::string(self)
    }
}

impl ToWire for &str {
    fn to_wire(&self) -> WireValue {
        WireValue::string(*self)
    }
}

/// Look up `key` in `map` and decode it, falling back to the type's absent
/// value when the key is missing.
pub fn read_field<T: Format>(
    map: &BTreeMap<String, WireValue>,
    key: &str,
) -> Result<T, ReadError> {
    match map.get(key) {
        Some(value) => T::read(value),
        None => T::absent().ok_or(ReadError::MissingProperty),
    }
}

/// Decode a `List`, reporting every bad element by its `[index]`.
pub fn read_list<T: Format>(wire: &WireValue) -> Result<Vec<T>, ReadError> {
    let items = wire
        .as_list()
        .ok_or_else(|| ReadError::no_property_of_type("L", wire))?;
    let mut acc = crate::Accumulator::new();
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(value) = acc.check(format!("[{index}]"), T::read(item)) {
            out.push(value);
        }
    }
    acc.into_result().map(|()| out)
}

impl Format for WireValue {
    fn write(&self) -> WireValue {
        self.clone()
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        Ok(wire.clone())
    }
}

impl Format for String {
    fn write(&self) -> WireValue {
        WireValue::Str(self.clone())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        wire.as_str()
            .map(str::to_string)
            .ok_or_else(|| ReadError::no_property_of_type("S", wire))
    }

    fn write_set(items: &[&Self]) -> WireValue {
        NonEmptySet::try_from_iter(items.iter().map(|s| (*s).clone()))
            .map(WireValue::StrSet)
            .unwrap_or(WireValue::Null)
    }

    fn read_set(wire: &WireValue) -> Result<Vec<Self>, ReadError> {
        match wire {
            WireValue::StrSet(set) => Ok(set.iter().cloned().collect()),
            WireValue::Null => Ok(Vec::new()),
            other => Err(ReadError::no_property_of_type("SS", other)),
        }
    }
}

impl Format for bool {
    fn write(&self) -> WireValue {
        WireValue::Bool(*self)
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        wire.as_bool()
            .ok_or_else(|| ReadError::no_property_of_type("BOOL", wire))
    }
}

impl Format for Bytes {
    fn write(&self) -> WireValue {
        WireValue::Bin(self.to_vec())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        wire.as_binary()
            .map(Bytes::copy_from_slice)
            .ok_or_else(|| ReadError::no_property_of_type("B", wire))
    }

    fn write_set(items: &[&Self]) -> WireValue {
        NonEmptySet::try_from_iter(items.iter().map(|b| b.to_vec()))
            .map(WireValue::BinSet)
            .unwrap_or(WireValue::Null)
    }

    fn read_set(wire: &WireValue) -> Result<Vec<Self>, ReadError> {
        match wire {
            WireValue::BinSet(set) => Ok(set.iter().map(|b| Bytes::copy_from_slice(b)).collect()),
            WireValue::Null => Ok(Vec::new()),
            other => Err(ReadError::no_property_of_type("BS", other)),
        }
    }
}

fn read_number_text<T>(wire: &WireValue, type_name: &str) -> Result<T, ReadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let number = wire
        .as_number()
        .ok_or_else(|| ReadError::no_property_of_type("N", wire))?;
    number
        .parse_as::<T>()
        .map_err(|e| ReadError::coercion(format!("{number} is not a valid {type_name}: {e}")))
}

macro_rules! integer_format {
    ($($t:ty),* $(,)?) => {
        $(
            impl Format for $t {
                fn write(&self) -> WireValue {
                    WireValue::Num(Number::from_i128(*self as i128))
                }

                fn read(wire: &WireValue) -> Result<Self, ReadError> {
                    read_number_text::<$t>(wire, stringify!($t))
                }

                fn write_set(items: &[&Self]) -> WireValue {
                    NonEmptySet::try_from_iter(items.iter().map(|n| Number::from_i128(**n as i128)))
                        .map(WireValue::NumSet)
                        .unwrap_or(WireValue::Null)
                }

                fn read_set(wire: &WireValue) -> Result<Vec<Self>, ReadError> {
                    match wire {
                        WireValue::NumSet(set) => {
                            let mut acc = crate::Accumulator::new();
                            let mut out = Vec::with_capacity(set.len());
                            for number in set {
                                let parsed = number.parse_as::<$t>().map_err(|e| {
                                    ReadError::coercion(format!(
                                        "{number} is not a valid {}: {e}",
                                        stringify!($t)
                                    ))
                                });
                                if let Some(value) = acc.check(number.as_str(), parsed) {
                                    out.push(value);
                                }
                            }
                            acc.into_result().map(|()| out)
                        }
                        WireValue::Null => Ok(Vec::new()),
                        other => Err(ReadError::no_property_of_type("NS", other)),
                    }
                }
            }
        )*
    };
}

integer_format!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl Format for u128 {
    fn write(&self) -> WireValue {
        WireValue::Num(Number::from_u128(*self))
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_number_text::<u128>(wire, "u128")
    }
}

// Non-finite floats have no number representation; they are written as
// `Null` and therefore do not read back.
impl Format for f64 {
    fn write(&self) -> WireValue {
        Number::from_f64(*self)
            .map(WireValue::Num)
            .unwrap_or(WireValue::Null)
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_number_text::<f64>(wire, "f64")
    }
}

impl Format for f32 {
    fn write(&self) -> WireValue {
        Number::from_f32(*self)
            .map(WireValue::Num)
            .unwrap_or(WireValue::Null)
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        read_number_text::<f32>(wire, "f32")
    }
}

impl Format for Number {
    fn write(&self) -> WireValue {
        WireValue::Num(self.clone())
    }

    fn read(wire: &WireValue) -> Result<Self, ReadError> {
        wire.as_number()
            .cloned()
            .ok_or_else(|| ReadError::no_property_of_type("N", wire))
    }

    fn write_set(items: &[&Self]) -> WireValue {
        NonEmptySet::try_from_iter(items.iter().map(|n| (*n).clone()))
            .map(WireValue::NumSet)
            .unwrap_or(WireValue::Null)
    }

    fn read_set(wire: &WireValue) -> Result<Vec<Self>, ReadError> {
        match wire {
            WireValue::NumSet(set) => Ok(set.iter().cloned().collect()),
            WireValue::Null => Ok(Vec::new()),
            other => Err(ReadError::no_property_of_type("NS", other)),
        }
    }
}
