//! The operation algebra and its interpreters.
//!
//! Store access is described, not performed. Leaf constructors such as
//! [`program::get_item`] build a [`Program`] holding one [`Operation`];
//! programs compose with [`Program::map`] and [`Program::and_then`] and only
//! touch a store when run against an [`Interpreter`] (or, non-blocking, an
//! [`AsyncInterpreter`]).
//!
//! Scans and queries are paginated with [`PageStream`], which re-issues the
//! operation with each page's continuation key until the store stops
//! returning one. [`InMemoryStore`] is a complete interpreter for tests.
//!
//! # Design Rules
//!
//! 1. Building a program never performs I/O.
//! 2. Operations run strictly in bind order; a failure short-circuits the
//!    rest of the program.
//! 3. Interpreter errors are surfaced unchanged. Item decoding errors are
//!    data and never abort a program.
//! 4. Batch calls never exceed 100 keys or 25 writes, and unprocessed
//!    entries are returned to the caller rather than retried.

pub mod error;
pub mod interpreter;
pub mod memory;
pub mod operation;
pub mod program;
pub mod render;
pub mod stream;

pub use error::{InterpreterError, InterpreterResult, ProgramError, ProgramResult};
pub use interpreter::{AsyncInterpreter, Interpreter};
pub use memory::{InMemoryStore, KeySchema, MAX_BATCH_GET, MAX_BATCH_WRITE};
pub use operation::{
    BatchGetOutput, BatchWriteOutput, ConsumedCapacity, Operation, PageOutput, QueryOptions,
    Response, WriteRequest,
};
pub use program::{
    batch_get, batch_write, delete_item, get_item, put_item, query, scan, update_item, Program,
};
pub use render::RenderedRequest;
pub use stream::{Page, PageStream, Pages};
