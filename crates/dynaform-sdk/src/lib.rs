//! Typed access to a tagged-union document store.
//!
//! A [`Table<T>`] binds a table name to a [`Codec<T>`] and turns typed
//! requests into [`Program`]s. Programs run against any [`Interpreter`];
//! [`InMemoryStore`] is the bundled one.
//!
//! ```
//! use dynaform_sdk::{derive_format, partition, InMemoryStore, KeySchema, Table};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Pet { owner: String, name: String }
//! derive_format!(struct Pet { owner, name });
//!
//! let store = InMemoryStore::new();
//! store.create_table("pets", KeySchema::composite("owner", "name")).unwrap();
//!
//! let pets = Table::<Pet>::new("pets");
//! let amy = Pet { owner: "sam".into(), name: "Amy".into() };
//! pets.put(&amy).run(&store).unwrap();
//!
//! let found = pets.query_all(&store, partition("owner", "sam")).unwrap();
//! assert_eq!(found, vec![Ok(amy)]);
//! ```
//!
//! # Design Rules
//!
//! 1. Codecs are passed explicitly; nothing is looked up ambiently.
//! 2. A bad item is reported as a `ReadError` in its own slot. It never hides
//!    its neighbours in a page or batch.
//! 3. Batch requests are split to the store's per-call maxima, and whatever
//!    the store leaves unprocessed is handed back to the caller.

pub mod config;
pub mod error;
pub mod table;

pub use config::TableConfig;
pub use error::{SdkError, SdkResult};
pub use table::{BatchGetResults, BatchWriteResults, Table};

pub use dynaform_codec::{
    codec, derive_format, Codec, CodecExt, FieldError, Format, ReadError, ToWire,
};
pub use dynaform_expr::{
    add, append, append_all, at, attr, delete, partition, remove, set, set_if_not_exists,
    sort_key, AttributePath, Condition, ConditionCompilationError, KeyCondition, UpdateExpression,
};
pub use dynaform_ops::{
    AsyncInterpreter, InMemoryStore, Interpreter, InterpreterError, KeySchema, Operation, Page,
    PageStream, Program, ProgramError, ProgramResult, QueryOptions, RenderedRequest, WriteRequest,
};
pub use dynaform_types::{Item, Key, Number, WireValue};
