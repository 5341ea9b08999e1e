//! Typed expressions over item attributes.
//!
//! Three expression families share one path model and one compiler:
//!
//! - [`Condition`] -- predicates for conditional writes and filters
//! - [`KeyCondition`] -- partition-key equality plus an optional sort-key
//!   predicate, for queries
//! - [`UpdateExpression`] -- the actions of an update
//!
//! Expressions are plain data. [`ExpressionCompiler`] renders them to text
//! with `#nK` name placeholders and `:vK` value placeholders; the
//! evaluators in [`eval`] run them directly against an [`Item`], which is
//! what the in-memory store uses.
//!
//! ```
//! use dynaform_expr::attr;
//!
//! let cond = attr("species").eq("Aardvark").and(attr("age").lt(10));
//! let compiled = cond.compile().unwrap();
//! assert_eq!(compiled.expression, "(#n0 = :v0 AND #n1 < :v1)");
//! ```
//!
//! # Design Rules
//!
//! 1. Attribute names and values never appear inline in expression text.
//! 2. Placeholders are numbered by first use and reused for repeats, so
//!    compilation is deterministic and both placeholder maps are injective.
//! 3. Binding one placeholder to two targets is an error, never a silent
//!    overwrite.
//!
//! [`Item`]: dynaform_types::Item

pub mod compile;
pub mod condition;
pub mod error;
pub mod eval;
pub mod key;
pub mod path;
pub mod update;

pub use compile::{CompiledExpression, ExpressionAttributes, ExpressionCompiler};
pub use condition::{at, attr, Attr, Comparator, Condition};
pub use error::{ConditionCompilationError, EvalError, EvalResult, ExprResult};
pub use eval::{compare_values, values_equal};
pub use key::{partition, sort_key, KeyCondition, SortCondition, SortKey};
pub use path::{AttributePath, PathSegment};
pub use update::{
    add, append, append_all, delete, remove, set, set_if_not_exists, UpdateAction,
    UpdateExpression,
};
