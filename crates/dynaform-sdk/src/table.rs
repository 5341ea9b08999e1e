//! Typed handles bound to one table and one codec.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use dynaform_codec::{codec, Codec, CodecExt, Format, ReadError};
use dynaform_expr::{Condition, KeyCondition, UpdateExpression};
use dynaform_ops::{
    program, AsyncInterpreter, Interpreter, PageStream, Program, ProgramError, ProgramResult,
    QueryOptions, WriteRequest,
};
use dynaform_types::{Item, Key};
use tracing::{debug, warn};

use crate::config::TableConfig;

/// Outcome of a chunked batch get.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchGetResults<T> {
    /// One decode attempt per returned item.
    pub items: Vec<Result<T, ReadError>>,
    pub unprocessed_keys: Vec<Key>,
}

/// Outcome of a chunked batch write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteResults {
    pub processed: Vec<WriteRequest>,
    /// Writes the store did not apply, exactly as they were submitted.
    pub unprocessed: Vec<WriteRequest>,
}

impl BatchWriteResults {
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// A table name, a codec for its items, and request settings.
///
/// Every method builds a [`Program`] or a [`PageStream`]; nothing touches
/// the store until an interpreter runs it. Builder methods (`given`,
/// `filter`, `descending`, `limit`) return adjusted copies, so one handle can
/// be shared freely.
pub struct Table<T> {
    name: String,
    codec: Arc<dyn Codec<T>>,
    config: TableConfig,
    condition: Option<Condition>,
    filter: Option<Condition>,
    ascending: bool,
    limit: Option<u32>,
}

impl<T: Format + Send + 'static> Table<T> {
    /// A table using the canonical codec of `T`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_codec(name, codec::<T>().shared())
    }
}

impl<T: Send + 'static> Table<T> {
    pub fn with_codec(name: impl Into<String>, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            name: name.into(),
            codec,
            config: TableConfig::default(),
            condition: None,
            filter: None,
            ascending: true,
            limit: None,
        }
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn codec(&self) -> &Arc<dyn Codec<T>> {
        &self.codec
    }

    /// Guard puts, deletes and updates made through the returned handle.
    pub fn given(&self, condition: Condition) -> Self {
        let mut table = self.clone();
        table.condition = Some(condition);
        table
    }

    /// Filter scan and query results. Filtered items still count towards
    /// the page limit.
    pub fn filter(&self, condition: Condition) -> Self {
        let mut table = self.clone();
        table.filter = Some(condition);
        table
    }

    /// Query in descending sort-key order.
    pub fn descending(&self) -> Self {
        let mut table = self.clone();
        table.ascending = false;
        table
    }

    /// Page limit, overriding the configured page size.
    pub fn limit(&self, limit: u32) -> Self {
        let mut table = self.clone();
        table.limit = Some(limit);
        table
    }

    fn encode(&self, value: &T) -> ProgramResult<Item> {
        self.codec
            .write(value)
            .into_map()
            .map_err(|_| ProgramError::NotAnItem(type_name::<T>()))
    }

    fn options(&self) -> QueryOptions {
        QueryOptions {
            limit: self.limit.or(self.config.page_size),
            filter: self.filter.clone(),
            exclusive_start_key: None,
            consistent: self.config.consistent_reads,
            ascending: self.ascending,
        }
    }

    // ---- Single items ----

    /// Look up one item. A stored item that fails to decode is returned as
    /// `Some(Err(..))`.
    pub fn get(&self, key: Key) -> Program<Option<Result<T, ReadError>>> {
        let codec = Arc::clone(&self.codec);
        let table = self.name.clone();
        program::get_item(self.name.clone(), key, self.config.consistent_reads)
            .map(move |item| item.map(|item| decode(&table, codec.as_ref(), item)))
    }

    pub fn put(&self, value: &T) -> Program<()> {
        match self.encode(value) {
            Ok(item) => program::put_item(self.name.clone(), item, self.condition.clone()),
            Err(error) => Program::fail(error),
        }
    }

    pub fn delete(&self, key: Key) -> Program<()> {
        program::delete_item(self.name.clone(), key, self.condition.clone())
    }

    /// Apply `update`, creating the item if needed, and decode the result.
    pub fn update(&self, key: Key, update: UpdateExpression) -> Program<Result<T, ReadError>> {
        let codec = Arc::clone(&self.codec);
        let table = self.name.clone();
        program::update_item(self.name.clone(), key, update, self.condition.clone())
            .map(move |item| decode(&table, codec.as_ref(), item))
    }

    // ---- Scans and queries ----

    pub fn scan(&self) -> PageStream<T> {
        PageStream::scan(self.name.clone(), None, self.options(), Arc::clone(&self.codec))
    }

    pub fn scan_index(&self, index: impl Into<String>) -> PageStream<T> {
        PageStream::scan(
            self.name.clone(),
            Some(index.into()),
            self.options(),
            Arc::clone(&self.codec),
        )
    }

    pub fn query(&self, key_condition: KeyCondition) -> PageStream<T> {
        PageStream::query(
            self.name.clone(),
            None,
            key_condition,
            self.options(),
            Arc::clone(&self.codec),
        )
    }

    pub fn query_index(&self, index: impl Into<String>, key_condition: KeyCondition) -> PageStream<T> {
        PageStream::query(
            self.name.clone(),
            Some(index.into()),
            key_condition,
            self.options(),
            Arc::clone(&self.codec),
        )
    }

    /// Every item of the table, up to the configured `max_items`.
    pub fn scan_all<I: Interpreter + ?Sized>(
        &self,
        interpreter: &I,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        self.scan().collect_all(interpreter, self.config.max_items)
    }

    pub async fn scan_all_async<I: AsyncInterpreter + ?Sized>(
        &self,
        interpreter: &I,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        self.scan()
            .collect_all_async(interpreter, self.config.max_items)
            .await
    }

    /// Every matching item, up to the configured `max_items`.
    pub fn query_all<I: Interpreter + ?Sized>(
        &self,
        interpreter: &I,
        key_condition: KeyCondition,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        self.query(key_condition)
            .collect_all(interpreter, self.config.max_items)
    }

    pub async fn query_all_async<I: AsyncInterpreter + ?Sized>(
        &self,
        interpreter: &I,
        key_condition: KeyCondition,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        self.query(key_condition)
            .collect_all_async(interpreter, self.config.max_items)
            .await
    }

    // ---- Batches ----

    /// Fetch `keys` in chunks of `batch_get_chunk`, one call per chunk.
    pub fn get_all(&self, keys: Vec<Key>) -> Program<BatchGetResults<T>> {
        let consistent = self.config.consistent_reads;
        let chunk = self.config.batch_get_chunk.max(1);
        let chunks: Vec<Program<_>> = keys
            .chunks(chunk)
            .map(|keys| program::batch_get(self.name.clone(), keys.to_vec(), consistent))
            .collect();
        let codec = Arc::clone(&self.codec);
        let table = self.name.clone();
        Program::sequence(chunks).map(move |outputs| {
            let mut results = BatchGetResults {
                items: Vec::new(),
                unprocessed_keys: Vec::new(),
            };
            for output in outputs {
                results.items.extend(
                    output
                        .items
                        .into_iter()
                        .map(|item| decode(&table, codec.as_ref(), item)),
                );
                results.unprocessed_keys.extend(output.unprocessed_keys);
            }
            results
        })
    }

    pub fn put_all(&self, values: &[T]) -> Program<BatchWriteResults> {
        let items: ProgramResult<Vec<Item>> = values.iter().map(|value| self.encode(value)).collect();
        match items {
            Ok(items) => self.write_all(items.into_iter().map(WriteRequest::Put).collect()),
            Err(error) => Program::fail(error),
        }
    }

    pub fn delete_all(&self, keys: Vec<Key>) -> Program<BatchWriteResults> {
        self.write_all(keys.into_iter().map(WriteRequest::Delete).collect())
    }

    /// Submit `writes` in chunks of `batch_write_chunk`. Unprocessed writes
    /// are reported, never retried.
    pub fn write_all(&self, writes: Vec<WriteRequest>) -> Program<BatchWriteResults> {
        let chunk = self.config.batch_write_chunk.max(1);
        let programs: Vec<Program<BatchWriteResults>> = writes
            .chunks(chunk)
            .map(|chunk| {
                let submitted = chunk.to_vec();
                program::batch_write(self.name.clone(), chunk.to_vec())
                    .map(move |output| split_processed(submitted, output.unprocessed))
            })
            .collect();
        let table = self.name.clone();
        Program::sequence(programs).map(move |parts| {
            let mut results = BatchWriteResults::default();
            for part in parts {
                results.processed.extend(part.processed);
                results.unprocessed.extend(part.unprocessed);
            }
            if !results.is_complete() {
                warn!(
                    table = %table,
                    unprocessed = results.unprocessed.len(),
                    "batch write left writes unprocessed"
                );
            }
            results
        })
    }
}

fn decode<T>(table: &str, codec: &dyn Codec<T>, item: Item) -> Result<T, ReadError> {
    let decoded = codec.read_item(item);
    if let Err(error) = &decoded {
        debug!(table, error = %error, "item failed to decode");
    }
    decoded
}

/// Each unprocessed write accounts for exactly one submitted write, so a
/// write submitted twice and rejected once still counts as processed once.
fn split_processed(submitted: Vec<WriteRequest>, unprocessed: Vec<WriteRequest>) -> BatchWriteResults {
    let mut outstanding = unprocessed.clone();
    let mut processed = Vec::with_capacity(submitted.len().saturating_sub(outstanding.len()));
    for write in submitted {
        match outstanding.iter().position(|left| *left == write) {
            Some(index) => {
                outstanding.swap_remove(index);
            }
            None => processed.push(write),
        }
    }
    BatchWriteResults {
        processed,
        unprocessed,
    }
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            codec: Arc::clone(&self.codec),
            config: self.config.clone(),
            condition: self.condition.clone(),
            filter: self.filter.clone(),
            ascending: self.ascending,
            limit: self.limit,
        }
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("item", &type_name::<T>())
            .field("config", &self.config)
            .field("condition", &self.condition)
            .field("filter", &self.filter)
            .field("ascending", &self.ascending)
            .field("limit", &self.limit)
            .finish()
    }
}
