//! Wire value model for Dynaform.
//!
//! The store is schemaless: every attribute travels as a tagged union of
//! string, number, binary, boolean, null, list, map, and typed sets of
//! strings, numbers, or binaries. This crate models that union and nothing
//! else. Converting typed domain values to and from it is the job of
//! `dynaform-codec`.
//!
//! # Key Types
//!
//! - [`WireValue`] -- one attribute value
//! - [`Number`] -- decimal text, validated on construction
//! - [`NonEmptySet`] -- the element container of the three set variants
//! - [`Item`] / [`Key`] -- attribute-name maps for whole items and primary keys
//!
//! # Invariants
//!
//! 1. Sets are never empty. The store forbids empty sets, so "empty" must be
//!    expressed by leaving the attribute out.
//! 2. A `Number` always parses as a decimal literal.
//! 3. Map keys are unique (enforced by `BTreeMap`).

pub mod error;
pub mod number;
pub mod set;
pub mod value;

pub use error::{TypeError, TypeResult};
pub use number::Number;
pub use set::NonEmptySet;
pub use value::{Item, Key, WireValue};
