//! Typed codecs for Dynaform wire values.
//!
//! A [`Codec<T>`] converts between a domain value `T` and a [`WireValue`].
//! Types get their canonical encoding by implementing [`Format`], either by
//! hand, through the implementations provided here for primitives and
//! containers, or with [`derive_format!`] for structs and enums. The
//! [`codec`] function turns a `Format` type into a codec value that can be
//! adapted ([`CodecExt::xmap`], [`CodecExt::coerced_xmap`]) and shared
//! across tables behind an `Arc`.
//!
//! # Encodings
//!
//! - strings, numbers, booleans, binaries: `S`, `N`, `BOOL`, `B`
//! - `Vec<T>`: `L`
//! - sets of strings, numbers, or binaries: `SS`, `NS`, `BS`; other sets: `L`
//! - string-keyed maps and structs: `M`
//! - `Option<T>`: the inner encoding, or absent
//!
//! # Design Rules
//!
//! 1. Reading never stops at the first bad field. All failures of one value
//!    are reported together in [`ReadError::InvalidCases`].
//! 2. `None` and empty sets are left out of maps. In positions that cannot
//!    be left out they are written as `Null`.
//! 3. An absent attribute and `Null` read the same way.
//! 4. Codecs hold no state and are safe to share between threads.

pub mod codec;
pub mod collections;
pub mod derive;
pub mod error;
pub mod format;

pub use codec::{codec, CoercedXmap, Codec, CodecExt, FormatCodec, Xmap};
pub use error::{Accumulator, FieldError, ReadError};
pub use format::{read_field, read_list, Format, ToWire};

pub use dynaform_types::{Item, Key, NonEmptySet, Number, WireValue};

#[doc(hidden)]
pub use derive::__private;
