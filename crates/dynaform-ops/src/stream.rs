//! Lazy pagination over scans and queries.

use std::fmt;
use std::sync::Arc;

use dynaform_codec::{Codec, ReadError};
use dynaform_expr::KeyCondition;
use dynaform_types::Key;
use tracing::debug;

use crate::error::{ProgramError, ProgramResult};
use crate::interpreter::{AsyncInterpreter, Interpreter};
use crate::operation::{ConsumedCapacity, Operation, PageOutput, QueryOptions, Response};
use crate::program::Program;

/// One decoded page. Items that failed to decode stay in place as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<Result<T, ReadError>>,
    /// The continuation token for the next page, if any.
    pub last_evaluated_key: Option<Key>,
    pub scanned_count: usize,
    pub consumed_capacity: Option<ConsumedCapacity>,
}

impl<T> Page<T> {
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| item.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ReadError> {
        self.items.iter().filter_map(|item| item.as_ref().err())
    }

    pub fn has_more(&self) -> bool {
        self.last_evaluated_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    After(Key),
    Done,
}

/// A forward-only sequence of pages for one scan or query.
///
/// Each pull re-issues the original operation with the previous page's
/// last evaluated key as its exclusive start key. A page without a last
/// evaluated key ends the stream. The stream holds nothing but that key, so
/// [`PageStream::restart`] simply starts over from the original operation.
pub struct PageStream<T> {
    operation: Operation,
    codec: Arc<dyn Codec<T>>,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<T: Send + 'static> PageStream<T> {
    /// Fails with [`ProgramError::NotPaginated`] unless `operation` is a scan
    /// or a query.
    pub fn new(operation: Operation, codec: Arc<dyn Codec<T>>) -> ProgramResult<Self> {
        if operation.query_options().is_none() {
            return Err(ProgramError::NotPaginated(operation.name()));
        }
        Ok(Self::from_operation(operation, codec))
    }

    pub fn scan(
        table: impl Into<String>,
        index: Option<String>,
        options: QueryOptions,
        codec: Arc<dyn Codec<T>>,
    ) -> Self {
        Self::from_operation(
            Operation::Scan {
                table: table.into(),
                index,
                options,
            },
            codec,
        )
    }

    pub fn query(
        table: impl Into<String>,
        index: Option<String>,
        key_condition: KeyCondition,
        options: QueryOptions,
        codec: Arc<dyn Codec<T>>,
    ) -> Self {
        Self::from_operation(
            Operation::Query {
                table: table.into(),
                index,
                key_condition,
                options,
            },
            codec,
        )
    }

    fn from_operation(operation: Operation, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            operation,
            codec,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn is_done(&self) -> bool {
        self.cursor == Cursor::Done
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The key the next page starts after.
    pub fn continuation(&self) -> Option<&Key> {
        match &self.cursor {
            Cursor::After(key) => Some(key),
            _ => None,
        }
    }

    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.pages_fetched = 0;
    }

    /// The program that fetches the next page, or `None` once the stream is
    /// exhausted. Running it does not move the stream; pass the page to
    /// [`PageStream::advance`] afterwards.
    pub fn next_page_program(&self) -> Option<Program<Page<T>>> {
        self.page_program(None)
    }

    fn page_program(&self, budget: Option<usize>) -> Option<Program<Page<T>>> {
        let mut operation = self.operation.clone();
        let options = operation.query_options_mut()?;
        match &self.cursor {
            Cursor::Start => {}
            Cursor::After(key) => options.exclusive_start_key = Some(key.clone()),
            Cursor::Done => return None,
        }
        if let Some(budget) = budget {
            let cap = u32::try_from(budget).unwrap_or(u32::MAX);
            options.limit = Some(options.limit.map_or(cap, |limit| limit.min(cap)));
        }
        let codec = Arc::clone(&self.codec);
        Some(
            Program::lift(operation)
                .try_map(Response::into_page)
                .map(move |output| decode_page(codec.as_ref(), output)),
        )
    }

    /// Move past `page`.
    pub fn advance(&mut self, page: &Page<T>) {
        self.pages_fetched += 1;
        self.cursor = match &page.last_evaluated_key {
            Some(key) => Cursor::After(key.clone()),
            None => Cursor::Done,
        };
        debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            more = page.has_more(),
            "fetched page"
        );
    }

    /// Fetch the next page, or `Ok(None)` once the stream is exhausted.
    pub fn next_page<I: Interpreter + ?Sized>(&mut self, interpreter: &I) -> ProgramResult<Option<Page<T>>> {
        let Some(program) = self.next_page_program() else {
            return Ok(None);
        };
        let page = program.run(interpreter)?;
        self.advance(&page);
        Ok(Some(page))
    }

    pub async fn next_page_async<I: AsyncInterpreter + ?Sized>(
        &mut self,
        interpreter: &I,
    ) -> ProgramResult<Option<Page<T>>> {
        let Some(program) = self.next_page_program() else {
            return Ok(None);
        };
        let page = program.run_async(interpreter).await?;
        self.advance(&page);
        Ok(Some(page))
    }

    /// Fetch pages until the stream ends or `max_items` results have been
    /// gathered. With a budget, each request's limit is lowered to what is
    /// left of it, so no fetched item is dropped and the stream can resume
    /// exactly where collection stopped.
    pub fn collect_all<I: Interpreter + ?Sized>(
        &mut self,
        interpreter: &I,
        max_items: Option<usize>,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        let mut out = Vec::new();
        loop {
            let budget = max_items.map(|max| max.saturating_sub(out.len()));
            if budget == Some(0) {
                break;
            }
            let Some(program) = self.page_program(budget) else {
                break;
            };
            let page = program.run(interpreter)?;
            self.advance(&page);
            out.extend(page.items);
        }
        Ok(out)
    }

    pub async fn collect_all_async<I: AsyncInterpreter + ?Sized>(
        &mut self,
        interpreter: &I,
        max_items: Option<usize>,
    ) -> ProgramResult<Vec<Result<T, ReadError>>> {
        let mut out = Vec::new();
        loop {
            let budget = max_items.map(|max| max.saturating_sub(out.len()));
            if budget == Some(0) {
                break;
            }
            let Some(program) = self.page_program(budget) else {
                break;
            };
            let page = program.run_async(interpreter).await?;
            self.advance(&page);
            out.extend(page.items);
        }
        Ok(out)
    }

    /// Iterate page by page with a blocking interpreter. The iterator ends
    /// after the last page or after the first error.
    pub fn pages<'a, I: Interpreter + ?Sized>(&'a mut self, interpreter: &'a I) -> Pages<'a, T, I> {
        Pages {
            stream: self,
            interpreter,
            failed: false,
        }
    }
}

fn decode_page<T>(codec: &dyn Codec<T>, output: PageOutput) -> Page<T> {
    let items = output
        .items
        .into_iter()
        .map(|item| {
            let decoded = codec.read_item(item);
            if let Err(error) = &decoded {
                debug!(error = %error, "item failed to decode");
            }
            decoded
        })
        .collect();
    Page {
        items,
        last_evaluated_key: output.last_evaluated_key,
        scanned_count: output.scanned_count,
        consumed_capacity: output.consumed_capacity,
    }
}

impl<T> fmt::Debug for PageStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStream")
            .field("operation", &self.operation.name())
            .field("table", &self.operation.table())
            .field("cursor", &self.cursor)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

/// Iterator returned by [`PageStream::pages`].
pub struct Pages<'a, T, I: ?Sized> {
    stream: &'a mut PageStream<T>,
    interpreter: &'a I,
    failed: bool,
}

impl<T: Send + 'static, I: Interpreter + ?Sized> Iterator for Pages<'_, T, I> {
    type Item = ProgramResult<Page<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.stream.next_page(self.interpreter) {
            Ok(page) => page.map(Ok),
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
