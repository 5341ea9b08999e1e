//! An in-memory store that executes operations directly.
//!
//! [`InMemoryStore`] satisfies both interpreter traits, so any program can be
//! tested without a network. It follows the store's observable rules: key
//! schemas, conditional writes, limits counted before filtering, per-call
//! batch maxima, and continuation keys on partial pages.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use dynaform_expr::{compare_values, Condition, KeyCondition};
use dynaform_types::{Item, Key, WireValue};
use tracing::debug;

use crate::error::{InterpreterError, InterpreterResult};
use crate::interpreter::{AsyncInterpreter, Interpreter};
use crate::operation::{
    BatchGetOutput, BatchWriteOutput, ConsumedCapacity, Operation, PageOutput, QueryOptions,
    Response, WriteRequest,
};

/// Most keys a single `BatchGetItem` call may carry.
pub const MAX_BATCH_GET: usize = 100;

/// Most writes a single `BatchWriteItem` call may carry.
pub const MAX_BATCH_WRITE: usize = 25;

/// The key attributes of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn partition(name: impl Into<String>) -> Self {
        Self {
            partition_key: name.into(),
            sort_key: None,
        }
    }

    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition_key: partition.into(),
            sort_key: Some(sort.into()),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    /// The key attributes of `item`, if it has all of them.
    pub fn key_of(&self, item: &Item) -> Option<Key> {
        self.attributes()
            .map(|name| item.get(name).map(|value| (name.to_string(), value.clone())))
            .collect()
    }

    fn attribute_count(&self) -> usize {
        if self.sort_key.is_some() {
            2
        } else {
            1
        }
    }

    fn position(&self, source: &Item) -> InterpreterResult<Position> {
        let mut values = Vec::with_capacity(self.attribute_count());
        for name in self.attributes() {
            let value = source.get(name).ok_or_else(|| {
                InterpreterError::validation(format!("missing key attribute {name}"))
            })?;
            if !matches!(value, WireValue::Str(_) | WireValue::Num(_) | WireValue::Bin(_)) {
                return Err(InterpreterError::validation(format!(
                    "key attribute {name} must be S, N or B, found {}",
                    value.type_tag()
                )));
            }
            values.push(value.clone());
        }
        Ok(Position(values))
    }

    /// A key must hold the key attributes and nothing else.
    fn validate_key(&self, key: &Key) -> InterpreterResult<Position> {
        if key.len() != self.attribute_count() {
            let expected: Vec<&str> = self.attributes().collect();
            return Err(InterpreterError::validation(format!(
                "key must contain exactly {expected:?}"
            )));
        }
        self.position(key)
    }
}

/// Sort position of an item: its key values in schema order.
#[derive(Debug, Clone)]
struct Position(Vec<WireValue>);

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            let ordering = compare_values(a, b).unwrap_or_else(|| a.cmp(b));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Position {}

struct TableData {
    schema: KeySchema,
    indexes: HashMap<String, KeySchema>,
    items: BTreeMap<Position, Item>,
}

impl TableData {
    fn check(&self, table: &str, condition: Option<&Condition>, existing: Option<&Item>) -> InterpreterResult<()> {
        let Some(condition) = condition else {
            return Ok(());
        };
        let empty = Item::new();
        if condition.evaluate(existing.unwrap_or(&empty)) {
            Ok(())
        } else {
            Err(InterpreterError::ConditionalCheckFailed {
                table: table.to_string(),
            })
        }
    }

    fn page(
        &self,
        table: &str,
        index: Option<&String>,
        key_condition: Option<&KeyCondition>,
        options: &QueryOptions,
    ) -> InterpreterResult<PageOutput> {
        let view = match index {
            None => self.schema.clone(),
            Some(name) => self.indexes.get(name).cloned().ok_or_else(|| {
                InterpreterError::ResourceNotFound(format!("index {name} on table {table}"))
            })?,
        };
        // Index entries are ordered by the index key, then the table key.
        let mut position_attrs: Vec<String> = view.attributes().map(str::to_string).collect();
        for name in self.schema.attributes() {
            if !position_attrs.iter().any(|existing| existing == name) {
                position_attrs.push(name.to_string());
            }
        }

        let mut entries: Vec<(Position, &Item)> = self
            .items
            .values()
            .filter_map(|item| position_of(&position_attrs, item).map(|position| (position, item)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(key_condition) = key_condition {
            if key_condition.partition_key() != view.partition_key {
                return Err(InterpreterError::validation(format!(
                    "query must target partition key {}",
                    view.partition_key
                )));
            }
            if let Some(sort) = key_condition.sort() {
                if view.sort_key.as_deref() != Some(sort.name()) {
                    return Err(InterpreterError::validation(format!(
                        "{} is not the sort key",
                        sort.name()
                    )));
                }
            }
            entries.retain(|(_, item)| key_condition.matches(item));
        }

        let ascending = key_condition.is_none() || options.ascending;
        if !ascending {
            entries.reverse();
        }
        if let Some(start) = &options.exclusive_start_key {
            let start = position_of(&position_attrs, start).ok_or_else(|| {
                InterpreterError::validation(format!(
                    "exclusive start key must contain {position_attrs:?}"
                ))
            })?;
            entries.retain(|(position, _)| if ascending { *position > start } else { *position < start });
        }

        let limit = match options.limit {
            Some(0) => return Err(InterpreterError::validation("limit must be positive")),
            Some(limit) => limit as usize,
            None => usize::MAX,
        };
        let more = entries.len() > limit;
        entries.truncate(limit);
        let last_evaluated_key = if more {
            entries.last().and_then(|(_, item)| project(&position_attrs, item))
        } else {
            None
        };
        let scanned_count = entries.len();
        let items = entries
            .into_iter()
            .map(|(_, item)| item)
            .filter(|item| options.filter.as_ref().map_or(true, |filter| filter.evaluate(item)))
            .cloned()
            .collect();
        Ok(PageOutput {
            items,
            last_evaluated_key,
            scanned_count,
            consumed_capacity: Some(read_capacity(table, scanned_count, options.consistent)),
        })
    }
}

fn position_of(attrs: &[String], source: &Item) -> Option<Position> {
    attrs
        .iter()
        .map(|name| source.get(name).cloned())
        .collect::<Option<Vec<_>>>()
        .map(Position)
}

fn project(attrs: &[String], item: &Item) -> Option<Key> {
    attrs
        .iter()
        .map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

fn read_capacity(table: &str, items: usize, consistent: bool) -> ConsumedCapacity {
    let per_item = if consistent { 1.0 } else { 0.5 };
    ConsumedCapacity {
        table: table.to_string(),
        capacity_units: items as f64 * per_item,
    }
}

fn write_capacity(table: &str, items: usize) -> ConsumedCapacity {
    ConsumedCapacity {
        table: table.to_string(),
        capacity_units: items as f64,
    }
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// HashMap-backed store double for tests and embedding.
///
/// Tables live behind a `RwLock`, so one store can serve concurrent
/// programs. Every executed operation is recorded and can be inspected with
/// [`InMemoryStore::executed`].
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, TableData>>,
    log: Mutex<Vec<Operation>>,
    batch_get_capacity: Mutex<Option<usize>>,
    batch_write_capacity: Mutex<Option<usize>>,
    failures: Mutex<VecDeque<InterpreterError>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, HashMap<String, TableData>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, HashMap<String, TableData>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty table.
    pub fn create_table(&self, name: impl Into<String>, schema: KeySchema) -> InterpreterResult<()> {
        let name = name.into();
        let mut tables = self.write_tables();
        if tables.contains_key(&name) {
            return Err(InterpreterError::validation(format!("table {name} already exists")));
        }
        debug!(table = %name, partition_key = %schema.partition_key, "created in-memory table");
        tables.insert(
            name,
            TableData {
                schema,
                indexes: HashMap::new(),
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Add a secondary index. Items without the index key attributes are
    /// left out of it.
    pub fn create_index(
        &self,
        table: &str,
        index: impl Into<String>,
        schema: KeySchema,
    ) -> InterpreterResult<()> {
        let mut tables = self.write_tables();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| not_found(table))?;
        data.indexes.insert(index.into(), schema);
        Ok(())
    }

    /// Store an item as-is, without conditions and without logging an
    /// operation. Useful for seeding items a codec could never write.
    pub fn insert_raw(&self, table: &str, item: Item) -> InterpreterResult<()> {
        let mut tables = self.write_tables();
        let data = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        let position = data.schema.position(&item)?;
        data.items.insert(position, item);
        Ok(())
    }

    /// Every item of `table`, in key order.
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.read_tables()
            .get(table)
            .map(|data| data.items.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.read_tables()
            .get(table)
            .map_or(0, |data| data.items.len())
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Serve at most `capacity` keys per batch get and hand the rest back as
    /// unprocessed keys. `None` serves everything.
    pub fn set_batch_get_capacity(&self, capacity: Option<usize>) {
        *self
            .batch_get_capacity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = capacity;
    }

    /// Apply at most `capacity` writes per batch call and hand the rest back
    /// as unprocessed. `None` applies everything.
    pub fn set_batch_write_capacity(&self, capacity: Option<usize>) {
        *self
            .batch_write_capacity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = capacity;
    }

    /// Make the next call fail with `error` instead of executing. Queued
    /// failures fire in the order they were queued.
    pub fn fail_next(&self, error: InterpreterError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Operations executed so far, oldest first.
    pub fn executed(&self) -> Vec<Operation> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn dispatch(&self, operation: &Operation) -> InterpreterResult<Response> {
        let table = operation.table();
        match operation {
            Operation::GetItem { key, .. } => {
                let tables = self.read_tables();
                let data = tables.get(table).ok_or_else(|| not_found(table))?;
                let position = data.schema.validate_key(key)?;
                Ok(Response::Item(data.items.get(&position).cloned()))
            }
            Operation::PutItem { item, condition, .. } => {
                let mut tables = self.write_tables();
                let data = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let position = data.schema.position(item)?;
                data.check(table, condition.as_ref(), data.items.get(&position))?;
                data.items.insert(position, item.clone());
                Ok(Response::Written)
            }
            Operation::DeleteItem { key, condition, .. } => {
                let mut tables = self.write_tables();
                let data = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let position = data.schema.validate_key(key)?;
                data.check(table, condition.as_ref(), data.items.get(&position))?;
                data.items.remove(&position);
                Ok(Response::Written)
            }
            Operation::UpdateItem {
                key,
                update,
                condition,
                ..
            } => {
                let mut tables = self.write_tables();
                let data = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                let position = data.schema.validate_key(key)?;
                let existing = data.items.get(&position);
                data.check(table, condition.as_ref(), existing)?;
                for action in update.actions() {
                    let root = action.path().root().unwrap_or_default();
                    if data.schema.attributes().any(|name| name == root) {
                        return Err(InterpreterError::validation(format!(
                            "cannot update key attribute {root}"
                        )));
                    }
                }
                let mut item = existing.cloned().unwrap_or_else(|| key.clone());
                update
                    .apply(&mut item)
                    .map_err(|error| InterpreterError::validation(error.to_string()))?;
                data.items.insert(position, item.clone());
                Ok(Response::Updated(item))
            }
            Operation::Scan { index, options, .. } => {
                let tables = self.read_tables();
                let data = tables.get(table).ok_or_else(|| not_found(table))?;
                data.page(table, index.as_ref(), None, options).map(Response::Page)
            }
            Operation::Query {
                index,
                key_condition,
                options,
                ..
            } => {
                let tables = self.read_tables();
                let data = tables.get(table).ok_or_else(|| not_found(table))?;
                data.page(table, index.as_ref(), Some(key_condition), options)
                    .map(Response::Page)
            }
            Operation::BatchGet {
                keys, consistent, ..
            } => {
                if keys.is_empty() || keys.len() > MAX_BATCH_GET {
                    return Err(InterpreterError::validation(format!(
                        "batch get takes 1 to {MAX_BATCH_GET} keys, got {}",
                        keys.len()
                    )));
                }
                let capacity = self
                    .batch_get_capacity
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .unwrap_or(usize::MAX);
                let tables = self.read_tables();
                let data = tables.get(table).ok_or_else(|| not_found(table))?;
                let positions = keys
                    .iter()
                    .map(|key| data.schema.validate_key(key))
                    .collect::<InterpreterResult<Vec<_>>>()?;
                let served = capacity.min(keys.len());
                let items: Vec<Item> = positions
                    .iter()
                    .take(served)
                    .filter_map(|position| data.items.get(position).cloned())
                    .collect();
                let unprocessed_keys = keys[served..].to_vec();
                if !unprocessed_keys.is_empty() {
                    debug!(table, unprocessed = unprocessed_keys.len(), "batch get over capacity");
                }
                Ok(Response::BatchGet(BatchGetOutput {
                    consumed_capacity: Some(read_capacity(table, served, *consistent)),
                    items,
                    unprocessed_keys,
                }))
            }
            Operation::BatchWrite { writes, .. } => {
                if writes.is_empty() || writes.len() > MAX_BATCH_WRITE {
                    return Err(InterpreterError::validation(format!(
                        "batch write takes 1 to {MAX_BATCH_WRITE} writes, got {}",
                        writes.len()
                    )));
                }
                let capacity = self
                    .batch_write_capacity
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .unwrap_or(usize::MAX);
                let mut tables = self.write_tables();
                let data = tables.get_mut(table).ok_or_else(|| not_found(table))?;
                // Validate the whole call before applying any of it.
                let positions = writes
                    .iter()
                    .map(|write| match write {
                        WriteRequest::Put(item) => data.schema.position(item),
                        WriteRequest::Delete(key) => data.schema.validate_key(key),
                    })
                    .collect::<InterpreterResult<Vec<_>>>()?;
                let applied = capacity.min(writes.len());
                for (write, position) in writes.iter().zip(positions).take(applied) {
                    match write {
                        WriteRequest::Put(item) => {
                            data.items.insert(position, item.clone());
                        }
                        WriteRequest::Delete(_) => {
                            data.items.remove(&position);
                        }
                    }
                }
                let unprocessed = writes[applied..].to_vec();
                if !unprocessed.is_empty() {
                    debug!(table, unprocessed = unprocessed.len(), "batch write over capacity");
                }
                Ok(Response::BatchWrite(BatchWriteOutput {
                    unprocessed,
                    consumed_capacity: Some(write_capacity(table, applied)),
                }))
            }
        }
    }
}

fn not_found(table: &str) -> InterpreterError {
    InterpreterError::ResourceNotFound(format!("table {table}"))
}

impl Interpreter for InMemoryStore {
    fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation.clone());
        let injected = self.failures.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        if let Some(error) = injected {
            debug!(operation = operation.name(), error = %error, "injected failure");
            return Err(error);
        }
        self.dispatch(operation)
    }
}

#[async_trait]
impl AsyncInterpreter for InMemoryStore {
    async fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
        tokio::task::yield_now().await;
        Interpreter::execute(self, operation)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables: Vec<String> = self.read_tables().keys().cloned().collect();
        f.debug_struct("InMemoryStore")
            .field("tables", &tables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use dynaform_expr::{attr, partition, set, sort_key};

    use super::*;
    use crate::program::{self, Program};

    fn item(species: &str, id: i64, name: &str) -> Item {
        Item::from([
            ("species".to_string(), WireValue::string(species)),
            ("id".to_string(), WireValue::number(id)),
            ("name".to_string(), WireValue::string(name)),
        ])
    }

    fn key(species: &str, id: i64) -> Key {
        Key::from([
            ("species".to_string(), WireValue::string(species)),
            ("id".to_string(), WireValue::number(id)),
        ])
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .create_table("pets", KeySchema::composite("species", "id"))
            .unwrap();
        store
    }

    fn run<A: Send + 'static>(store: &InMemoryStore, program: Program<A>) -> crate::ProgramResult<A> {
        program.run(store)
    }

    #[test]
    fn put_get_delete() {
        let store = store();
        run(&store, program::put_item("pets", item("cat", 1, "Tom"), None)).unwrap();
        let found = run(&store, program::get_item("pets", key("cat", 1), false)).unwrap();
        assert_eq!(found, Some(item("cat", 1, "Tom")));
        run(&store, program::delete_item("pets", key("cat", 1), None)).unwrap();
        assert_eq!(run(&store, program::get_item("pets", key("cat", 1), true)), Ok(None));
        assert_eq!(store.executed().len(), 4);
    }

    #[test]
    fn missing_table_and_bad_keys() {
        let store = store();
        assert!(matches!(
            run(&store, program::get_item("nope", key("cat", 1), false)),
            Err(crate::ProgramError::Interpreter(InterpreterError::ResourceNotFound(_)))
        ));
        let partial = Key::from([("species".to_string(), WireValue::string("cat"))]);
        assert!(matches!(
            run(&store, program::get_item("pets", partial, false)),
            Err(crate::ProgramError::Interpreter(InterpreterError::Validation(_)))
        ));
        let mut bad = item("cat", 1, "Tom");
        bad.insert("id".into(), WireValue::Bool(true));
        assert!(run(&store, program::put_item("pets", bad, None)).is_err());
    }

    #[test]
    fn numeric_keys_compare_by_value() {
        let store = store();
        store.insert_raw("pets", item("cat", 10, "Ten")).unwrap();
        let mut same = key("cat", 10);
        same.insert("id".into(), WireValue::Num("10.0".parse().unwrap()));
        let found = run(&store, program::get_item("pets", same, false)).unwrap();
        assert_eq!(found.map(|i| i["name"].clone()), Some(WireValue::string("Ten")));
    }

    #[test]
    fn conditional_writes() {
        let store = store();
        let create = || program::put_item("pets", item("cat", 1, "Tom"), Some(attr("id").not_exists()));
        run(&store, create()).unwrap();
        assert_eq!(
            run(&store, create()),
            Err(crate::ProgramError::Interpreter(InterpreterError::ConditionalCheckFailed {
                table: "pets".into()
            }))
        );
        let guarded = program::delete_item("pets", key("cat", 1), Some(attr("name").eq("Jerry")));
        assert!(run(&store, guarded).is_err());
        assert_eq!(store.len("pets"), 1);
    }

    #[test]
    fn update_upserts_and_protects_keys() {
        let store = store();
        let updated = run(
            &store,
            program::update_item("pets", key("dog", 3), set("name", "Rex"), None),
        )
        .unwrap();
        assert_eq!(updated, item("dog", 3, "Rex"));

        let result = run(
            &store,
            program::update_item("pets", key("dog", 3), set("id", 4), None),
        );
        assert!(matches!(
            result,
            Err(crate::ProgramError::Interpreter(InterpreterError::Validation(_)))
        ));
    }

    #[test]
    fn query_orders_by_sort_key_and_honours_direction() {
        let store = store();
        for id in [3, 1, 20, 2] {
            store.insert_raw("pets", item("cat", id, "c")).unwrap();
        }
        store.insert_raw("pets", item("dog", 1, "d")).unwrap();
        let ids = |page: &PageOutput| -> Vec<WireValue> {
            page.items.iter().map(|i| i["id"].clone()).collect()
        };

        let ascending = run(
            &store,
            program::query("pets", None, partition("species", "cat"), QueryOptions::default()),
        )
        .unwrap();
        let expected: Vec<WireValue> = [1i64, 2, 3, 20].into_iter().map(WireValue::number).collect();
        assert_eq!(ids(&ascending), expected);

        let descending = run(
            &store,
            program::query(
                "pets",
                None,
                partition("species", "cat").and(sort_key("id").lt(20)),
                QueryOptions {
                    ascending: false,
                    ..QueryOptions::default()
                },
            ),
        )
        .unwrap();
        let expected: Vec<WireValue> = [3i64, 2, 1].into_iter().map(WireValue::number).collect();
        assert_eq!(ids(&descending), expected);
    }

    #[test]
    fn limit_counts_items_before_the_filter() {
        let store = store();
        for id in 0..10 {
            let name = if id % 2 == 0 { "even" } else { "odd" };
            store.insert_raw("pets", item("cat", id, name)).unwrap();
        }
        let page = run(
            &store,
            program::scan(
                "pets",
                None,
                QueryOptions {
                    limit: Some(4),
                    filter: Some(attr("name").eq("even")),
                    ..QueryOptions::default()
                },
            ),
        )
        .unwrap();
        assert_eq!(page.scanned_count, 4);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_evaluated_key, Some(key("cat", 3)));

        let next = run(
            &store,
            program::scan(
                "pets",
                None,
                QueryOptions {
                    limit: Some(100),
                    exclusive_start_key: page.last_evaluated_key.clone(),
                    ..QueryOptions::default()
                },
            ),
        )
        .unwrap();
        assert_eq!(next.items.len(), 6);
        assert_eq!(next.last_evaluated_key, None);
    }

    #[test]
    fn secondary_index_is_sparse_and_keyed() {
        let store = store();
        store
            .create_index("pets", "by_name", KeySchema::partition("name"))
            .unwrap();
        store.insert_raw("pets", item("cat", 1, "Tom")).unwrap();
        store.insert_raw("pets", item("dog", 2, "Tom")).unwrap();
        store
            .insert_raw("pets", Item::from([
                ("species".to_string(), WireValue::string("fish")),
                ("id".to_string(), WireValue::number(3i64)),
            ]))
            .unwrap();

        let page = run(
            &store,
            program::query(
                "pets",
                Some("by_name".into()),
                partition("name", "Tom"),
                QueryOptions {
                    limit: Some(1),
                    ..QueryOptions::default()
                },
            ),
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        let token = page.last_evaluated_key.unwrap();
        assert_eq!(token.len(), 3);

        let scan = run(&store, program::scan("pets", Some("by_name".into()), QueryOptions::default())).unwrap();
        assert_eq!(scan.items.len(), 2);

        assert!(run(
            &store,
            program::scan("pets", Some("missing".into()), QueryOptions::default())
        )
        .is_err());
    }

    #[test]
    fn batch_write_leaves_over_capacity_writes_unprocessed() {
        let store = store();
        store.set_batch_write_capacity(Some(8));
        let writes: Vec<WriteRequest> = (0..10)
            .map(|id| WriteRequest::Put(item("cat", id, "c")))
            .collect();
        let output = run(&store, program::batch_write("pets", writes.clone())).unwrap();
        assert_eq!(output.unprocessed, writes[8..].to_vec());
        assert_eq!(store.len("pets"), 8);
        assert_eq!(
            output.consumed_capacity.map(|c| c.capacity_units),
            Some(8.0)
        );
    }

    #[test]
    fn batch_calls_enforce_their_maxima() {
        let store = store();
        let writes: Vec<WriteRequest> = (0..26)
            .map(|id| WriteRequest::Put(item("cat", id, "c")))
            .collect();
        assert!(run(&store, program::batch_write("pets", writes)).is_err());
        assert!(store.is_empty("pets"));

        let keys: Vec<Key> = (0..101).map(|id| key("cat", id)).collect();
        assert!(run(&store, program::batch_get("pets", keys, false)).is_err());
    }

    #[test]
    fn batch_get_returns_found_items() {
        let store = store();
        store.insert_raw("pets", item("cat", 1, "a")).unwrap();
        store.insert_raw("pets", item("cat", 2, "b")).unwrap();
        let output = run(
            &store,
            program::batch_get("pets", vec![key("cat", 1), key("cat", 2), key("cat", 9)], true),
        )
        .unwrap();
        assert_eq!(output.items.len(), 2);
        assert!(output.unprocessed_keys.is_empty());
    }

    #[test]
    fn injected_failures_pass_through_once() {
        let store = store();
        store.fail_next(InterpreterError::Service("throttled".into()));
        let first = run(&store, program::get_item("pets", key("cat", 1), false));
        assert_eq!(
            first,
            Err(crate::ProgramError::Interpreter(InterpreterError::Service("throttled".into())))
        );
        assert_eq!(run(&store, program::get_item("pets", key("cat", 1), false)), Ok(None));
    }

    #[test]
    fn batch_get_over_capacity_returns_unprocessed_keys() {
        let store = store();
        for id in 0..5 {
            store.insert_raw("pets", item("cat", id, "c")).unwrap();
        }
        store.set_batch_get_capacity(Some(3));
        let keys: Vec<Key> = (0..5).map(|id| key("cat", id)).collect();
        let output = run(&store, program::batch_get("pets", keys.clone(), false)).unwrap();
        assert_eq!(output.items.len(), 3);
        assert_eq!(output.unprocessed_keys, keys[3..].to_vec());

        store.set_batch_get_capacity(None);
        let output = run(&store, program::batch_get("pets", keys, false)).unwrap();
        assert_eq!(output.items.len(), 5);
        assert!(output.unprocessed_keys.is_empty());
    }

    #[test]
    fn queued_failures_fire_in_order() {
        let store = store();
        store.fail_next(InterpreterError::Service("first".into()));
        store.fail_next(InterpreterError::Service("second".into()));
        let get = || run(&store, program::get_item("pets", key("cat", 1), false));
        assert_eq!(
            get(),
            Err(crate::ProgramError::Interpreter(InterpreterError::Service("first".into())))
        );
        assert_eq!(
            get(),
            Err(crate::ProgramError::Interpreter(InterpreterError::Service("second".into())))
        );
        assert_eq!(get(), Ok(None));
    }

    #[test]
    fn long_sequences_run_without_deep_recursion() {
        let store = store();
        let puts = (0..100_000).map(|id| program::put_item("pets", item("cat", id, "c"), None));
        let done = run(&store, Program::sequence(puts)).unwrap();
        assert_eq!(done.len(), 100_000);
        assert_eq!(store.len("pets"), 100_000);
    }

    #[tokio::test]
    async fn async_interpreter_shares_state() {
        let store = store();
        program::put_item("pets", item("cat", 5, "Async"), None)
            .run_async(&store)
            .await
            .unwrap();
        let found = program::get_item("pets", key("cat", 5), true)
            .run(&store)
            .unwrap();
        assert!(found.is_some());
    }
}
