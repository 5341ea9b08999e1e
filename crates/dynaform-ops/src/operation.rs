//! The operation instruction set and the responses it produces.

use dynaform_expr::{Condition, KeyCondition, UpdateExpression};
use dynaform_types::{Item, Key};
use serde::Serialize;

use crate::error::{ProgramError, ProgramResult};

/// Options shared by scans and queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of items evaluated per call, before filtering.
    pub limit: Option<u32>,
    /// Applied after the limit; filtered items still count against it.
    pub filter: Option<Condition>,
    /// Resume after this key.
    pub exclusive_start_key: Option<Key>,
    pub consistent: bool,
    /// Sort-key order for queries. Scans ignore it.
    pub ascending: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: None,
            filter: None,
            exclusive_start_key: None,
            consistent: false,
            ascending: true,
        }
    }
}

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WriteRequest {
    Put(Item),
    Delete(Key),
}

/// A description of one store call. Operations are inert data until an
/// interpreter executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    GetItem {
        table: String,
        key: Key,
        consistent: bool,
    },
    PutItem {
        table: String,
        item: Item,
        condition: Option<Condition>,
    },
    DeleteItem {
        table: String,
        key: Key,
        condition: Option<Condition>,
    },
    UpdateItem {
        table: String,
        key: Key,
        update: UpdateExpression,
        condition: Option<Condition>,
    },
    Scan {
        table: String,
        index: Option<String>,
        options: QueryOptions,
    },
    Query {
        table: String,
        index: Option<String>,
        key_condition: KeyCondition,
        options: QueryOptions,
    },
    BatchGet {
        table: String,
        keys: Vec<Key>,
        consistent: bool,
    },
    BatchWrite {
        table: String,
        writes: Vec<WriteRequest>,
    },
}

impl Operation {
    /// The store action name, e.g. `"GetItem"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetItem { .. } => "GetItem",
            Self::PutItem { .. } => "PutItem",
            Self::DeleteItem { .. } => "DeleteItem",
            Self::UpdateItem { .. } => "UpdateItem",
            Self::Scan { .. } => "Scan",
            Self::Query { .. } => "Query",
            Self::BatchGet { .. } => "BatchGetItem",
            Self::BatchWrite { .. } => "BatchWriteItem",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::GetItem { table, .. }
            | Self::PutItem { table, .. }
            | Self::DeleteItem { table, .. }
            | Self::UpdateItem { table, .. }
            | Self::Scan { table, .. }
            | Self::Query { table, .. }
            | Self::BatchGet { table, .. }
            | Self::BatchWrite { table, .. } => table,
        }
    }

    /// Scan and query options, if this operation has them.
    pub fn query_options(&self) -> Option<&QueryOptions> {
        match self {
            Self::Scan { options, .. } | Self::Query { options, .. } => Some(options),
            _ => None,
        }
    }

    pub fn query_options_mut(&mut self) -> Option<&mut QueryOptions> {
        match self {
            Self::Scan { options, .. } | Self::Query { options, .. } => Some(options),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Capacity reported by the store. Passed through, never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedCapacity {
    pub table: String,
    pub capacity_units: f64,
}

/// One page of a scan or query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageOutput {
    pub items: Vec<Item>,
    /// Present when the store stopped before the end of the result set.
    pub last_evaluated_key: Option<Key>,
    /// Items evaluated before the filter was applied.
    pub scanned_count: usize,
    pub consumed_capacity: Option<ConsumedCapacity>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchGetOutput {
    pub items: Vec<Item>,
    pub unprocessed_keys: Vec<Key>,
    pub consumed_capacity: Option<ConsumedCapacity>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchWriteOutput {
    /// Writes the store did not apply. Everything else in the call was.
    pub unprocessed: Vec<WriteRequest>,
    pub consumed_capacity: Option<ConsumedCapacity>,
}

/// The store's answer to one [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `GetItem`.
    Item(Option<Item>),
    /// `PutItem` and `DeleteItem`.
    Written,
    /// `UpdateItem`, carrying the item as it is after the update.
    Updated(Item),
    Page(PageOutput),
    BatchGet(BatchGetOutput),
    BatchWrite(BatchWriteOutput),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Item(_) => "Item",
            Self::Written => "Written",
            Self::Updated(_) => "Updated",
            Self::Page(_) => "Page",
            Self::BatchGet(_) => "BatchGet",
            Self::BatchWrite(_) => "BatchWrite",
        }
    }

    fn unexpected(&self, expected: &'static str) -> ProgramError {
        ProgramError::UnexpectedResponse {
            expected,
            found: self.kind(),
        }
    }

    pub fn into_item(self) -> ProgramResult<Option<Item>> {
        match self {
            Self::Item(item) => Ok(item),
            other => Err(other.unexpected("Item")),
        }
    }

    pub fn into_written(self) -> ProgramResult<()> {
        match self {
            Self::Written => Ok(()),
            other => Err(other.unexpected("Written")),
        }
    }

    pub fn into_updated(self) -> ProgramResult<Item> {
        match self {
            Self::Updated(item) => Ok(item),
            other => Err(other.unexpected("Updated")),
        }
    }

    pub fn into_page(self) -> ProgramResult<PageOutput> {
        match self {
            Self::Page(page) => Ok(page),
            other => Err(other.unexpected("Page")),
        }
    }

    pub fn into_batch_get(self) -> ProgramResult<BatchGetOutput> {
        match self {
            Self::BatchGet(output) => Ok(output),
            other => Err(other.unexpected("BatchGet")),
        }
    }

    pub fn into_batch_write(self) -> ProgramResult<BatchWriteOutput> {
        match self {
            Self::BatchWrite(output) => Ok(output),
            other => Err(other.unexpected("BatchWrite")),
        }
    }
}
