//! Structural derivation of [`Format`](crate::Format) for product and sum types.
//!
//! [`derive_format!`](crate::derive_format) generates the implementation at
//! compile time from a field or alternative listing:
//!
//! ```
//! use dynaform_codec::{derive_format, Format, WireValue};
//!
//! #[derive(Debug, PartialEq)]
//! enum Species { Aardvark, Zebra }
//! derive_format!(enum Species { Aardvark, Zebra });
//!
//! #[derive(Debug, PartialEq)]
//! struct Pet { name: String, species: Species }
//! derive_format!(struct Pet { name, species });
//!
//! let amy = Pet { name: "Amy".into(), species: Species::Aardvark };
//! assert_eq!(Pet::read(&amy.write()), Ok(amy));
//! ```
//!
//! Encodings:
//!
//! - struct: a `Map` keyed by field name. Fields whose encoding chooses to be
//!   left out (`None`, empty sets) are left out.
//! - enum with only unit alternatives: the alternative name as a bare `S`.
//! - enum with any data-bearing alternative: every alternative, unit ones
//!   included, as a single-key `Map` from alternative name to its payload.
//!   Unit payloads are an empty map; struct-like payloads are a field map;
//!   newtype payloads are the inner value's own encoding.
//!
//! Decoding a struct (or struct-like alternative) checks every field and
//! reports all failures in one `InvalidCases`. Errors inside an alternative
//! are attributed to the alternative's name.

use std::collections::BTreeMap;

use dynaform_types::WireValue;

use crate::error::ReadError;

/// Derive [`Format`](crate::Format) for a struct or enum. See the
/// [module docs](crate::derive) for the encodings.
#[macro_export]
macro_rules! derive_format {
    (struct $name:ident { $( $field:ident ),* $(,)? }) => {
        impl $crate::Format for $name {
            fn write(&self) -> $crate::WireValue {
                #[allow(unused_mut)]
                let mut map = $crate::__private::BTreeMap::new();
                $(
                    if let ::core::option::Option::Some(value) =
                        $crate::Format::write_field(&self.$field)
                    {
                        map.insert(::std::string::String::from(stringify!($field)), value);
                    }
                )*
                $crate::WireValue::Map(map)
            }

            #[allow(unreachable_patterns, unused_variables, unused_mut)]
            fn read(wire: &$crate::WireValue) -> ::core::result::Result<Self, $crate::ReadError> {
                let map = $crate::__private::expect_map(wire)?;
                $crate::__read_fields!(map; [Self]; $( $field ),*)
            }
        }
    };

    (enum $name:ident { $( $variant:ident ),+ $(,)? }) => {
        impl $crate::Format for $name {
            fn write(&self) -> $crate::WireValue {
                match self {
                    $(
                        Self::$variant => $crate::WireValue::Str(
                            ::std::string::String::from(stringify!($variant)),
                        ),
                    )+
                }
            }

            fn read(wire: &$crate::WireValue) -> ::core::result::Result<Self, $crate::ReadError> {
                match $crate::__private::expect_str(wire)? {
                    $( stringify!($variant) => ::core::result::Result::Ok(Self::$variant), )+
                    other => ::core::result::Result::Err(
                        $crate::__private::unknown_alternative(stringify!($name), other),
                    ),
                }
            }
        }
    };

    (enum $name:ident {
        $( $variant:ident $( { $( $field:ident ),* $(,)? } )? $( ( $payload:ident ) )? ),+ $(,)?
    }) => {
        impl $crate::Format for $name {
            fn write(&self) -> $crate::WireValue {
                match self {
                    $(
                        Self::$variant { $( $( $field ),* )? $( 0: $payload )? } => {
                            let body = $crate::__variant_body!(
                                $( { $( $field ),* } )? $( ( $payload ) )?
                            );
                            $crate::__private::tagged(stringify!($variant), body)
                        }
                    )+
                }
            }

            #[allow(unreachable_patterns, unused_variables, unused_mut)]
            fn read(wire: &$crate::WireValue) -> ::core::result::Result<Self, $crate::ReadError> {
                let (tag, body) = $crate::__private::expect_tagged(wire)?;
                match tag {
                    $(
                        stringify!($variant) => {
                            let result: ::core::result::Result<Self, $crate::ReadError> =
                                $crate::__read_variant!(
                                    body; $variant; $( { $( $field ),* } )? $( ( $payload ) )?
                                );
                            result.map_err(|error| {
                                $crate::ReadError::invalid_case(stringify!($variant), error)
                            })
                        }
                    )+
                    other => ::core::result::Result::Err(
                        $crate::__private::unknown_alternative(stringify!($name), other),
                    ),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __read_fields {
    ($map:ident; [ $( $ctor:tt )+ ]; $( $field:ident ),*) => {{
        let mut acc = $crate::Accumulator::new();
        $(
            let $field = acc.check(
                stringify!($field),
                $crate::read_field($map, stringify!($field)),
            );
        )*
        match ( $( $field, )* ) {
            ( $( ::core::option::Option::Some($field), )* ) => {
                ::core::result::Result::Ok($( $ctor )+ { $( $field ),* })
            }
            _ => ::core::result::Result::Err(acc.into_error()),
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __variant_body {
    () => {
        $crate::WireValue::Map($crate::__private::BTreeMap::new())
    };
    ({ $( $field:ident ),* }) => {{
        #[allow(unused_mut)]
        let mut map = $crate::__private::BTreeMap::new();
        $(
            if let ::core::option::Option::Some(value) = $crate::Format::write_field($field) {
                map.insert(::std::string::String::from(stringify!($field)), value);
            }
        )*
        $crate::WireValue::Map(map)
    }};
    (( $payload:ident )) => {
        $crate::Format::write($payload)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __read_variant {
    ($body:ident; $variant:ident; ) => {
        $crate::__private::expect_unit($body).map(|()| Self::$variant {})
    };
    ($body:ident; $variant:ident; { $( $field:ident ),* }) => {
        $crate::__private::expect_map($body)
            .and_then(|map| $crate::__read_fields!(map; [Self::$variant]; $( $field ),*))
    };
    ($body:ident; $variant:ident; ( $payload:ident )) => {
        $crate::Format::read($body).map(|$payload| Self::$variant { 0: $payload })
    };
}

// Support functions referenced by the generated code.
#[doc(hidden)]
pub mod __private {
    pub use std::collections::BTreeMap;

    pub use super::{expect_map, expect_str, expect_tagged, expect_unit, tagged, unknown_alternative};
}

#[doc(hidden)]
pub fn expect_map(wire: &WireValue) -> Result<&BTreeMap<String, WireValue>, ReadError> {
    wire.as_map()
        .ok_or_else(|| ReadError::no_property_of_type("M", wire))
}

#[doc(hidden)]
pub fn expect_str(wire: &WireValue) -> Result<&str, ReadError> {
    wire.as_str()
        .ok_or_else(|| ReadError::no_property_of_type("S", wire))
}

/// Split a single-key map into its alternative name and payload.
#[doc(hidden)]
pub fn expect_tagged(wire: &WireValue) -> Result<(&str, &WireValue), ReadError> {
    let map = expect_map(wire)?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((tag, body)), None) => Ok((tag.as_str(), body)),
        _ => Err(ReadError::coercion(format!(
            "expected exactly one alternative key, found {}",
            map.len()
        ))),
    }
}

/// Unit alternatives carry an empty map; `Null` is accepted as well.
#[doc(hidden)]
pub fn expect_unit(wire: &WireValue) -> Result<(), ReadError> {
    match wire {
        WireValue::Map(_) | WireValue::Null => Ok(()),
        other => Err(ReadError::no_property_of_type("M", other)),
    }
}

#[doc(hidden)]
pub fn tagged(name: &str, body: WireValue) -> WireValue {
    WireValue::Map(BTreeMap::from([(name.to_string(), body)]))
}

#[doc(hidden)]
pub fn unknown_alternative(type_name: &str, tag: &str) -> ReadError {
    ReadError::coercion(format!("{tag:?} is not an alternative of {type_name}"))
}
