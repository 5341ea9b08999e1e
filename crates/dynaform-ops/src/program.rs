//! Programs: operations sequenced so that each result can shape the next step.
//!
//! A [`Program`] is a value. Building one performs no I/O; running it with
//! [`Program::run`] or [`Program::run_async`] executes its operations one at
//! a time, in order, each through a single interpreter call.

use std::collections::VecDeque;
use std::fmt;

use dynaform_expr::{Condition, KeyCondition, UpdateExpression};
use dynaform_types::{Item, Key};
use tracing::debug;

use crate::error::{ProgramError, ProgramResult};
use crate::interpreter::{AsyncInterpreter, Interpreter};
use crate::operation::{
    BatchGetOutput, BatchWriteOutput, Operation, PageOutput, QueryOptions, Response, WriteRequest,
};

type Continuation<A> = Box<dyn FnOnce(Response) -> Program<A> + Send>;

/// A sequence of store operations producing an `A`.
pub enum Program<A> {
    /// Finished with a value.
    Pure(A),
    /// Finished with an error.
    Fail(ProgramError),
    /// Execute the operation, then continue with its response.
    Step(Operation, Continuation<A>),
}

impl<A: Send + 'static> Program<A> {
    pub fn pure(value: A) -> Self {
        Self::Pure(value)
    }

    pub fn fail(error: impl Into<ProgramError>) -> Self {
        Self::Fail(error.into())
    }

    pub fn from_result(result: ProgramResult<A>) -> Self {
        match result {
            Ok(value) => Self::Pure(value),
            Err(error) => Self::Fail(error),
        }
    }

    pub fn map<B, F>(self, f: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self {
            Self::Pure(value) => Program::Pure(f(value)),
            Self::Fail(error) => Program::Fail(error),
            Self::Step(operation, next) => {
                Program::Step(operation, Box::new(move |response| next(response).map(f)))
            }
        }
    }

    /// Continue with a program built from this one's result.
    pub fn and_then<B, F>(self, f: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Program<B> + Send + 'static,
    {
        match self {
            Self::Pure(value) => f(value),
            Self::Fail(error) => Program::Fail(error),
            Self::Step(operation, next) => {
                Program::Step(operation, Box::new(move |response| next(response).and_then(f)))
            }
        }
    }

    /// Continue with a fallible conversion of this program's result.
    pub fn try_map<B, F>(self, f: F) -> Program<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> ProgramResult<B> + Send + 'static,
    {
        self.and_then(|value| Program::from_result(f(value)))
    }

    /// Run every program in order and collect their results.
    pub fn sequence<I>(programs: I) -> Program<Vec<A>>
    where
        I: IntoIterator<Item = Program<A>>,
    {
        let rest: VecDeque<Program<A>> = programs.into_iter().collect();
        let done = Vec::with_capacity(rest.len());
        resume_sequence(rest, done)
    }

    /// The operation this program will execute next, if any.
    pub fn pending(&self) -> Option<&Operation> {
        match self {
            Self::Step(operation, _) => Some(operation),
            _ => None,
        }
    }

    /// Execute the program with a blocking interpreter.
    pub fn run<I: Interpreter + ?Sized>(self, interpreter: &I) -> ProgramResult<A> {
        let mut program = self;
        loop {
            match program {
                Self::Pure(value) => return Ok(value),
                Self::Fail(error) => return Err(error),
                Self::Step(operation, next) => {
                    debug!(operation = operation.name(), table = operation.table(), "executing operation");
                    let response = interpreter.execute(&operation)?;
                    program = next(response);
                }
            }
        }
    }

    /// Execute the program with a non-blocking interpreter.
    pub async fn run_async<I: AsyncInterpreter + ?Sized>(self, interpreter: &I) -> ProgramResult<A> {
        let mut program = self;
        loop {
            match program {
                Self::Pure(value) => return Ok(value),
                Self::Fail(error) => return Err(error),
                Self::Step(operation, next) => {
                    debug!(operation = operation.name(), table = operation.table(), "executing operation");
                    let response = interpreter.execute(&operation).await?;
                    program = next(response);
                }
            }
        }
    }
}

/// Advance a sequence to its next pending operation. Each continuation
/// re-enters here, so stack depth stays constant however long the sequence.
fn resume_sequence<A: Send + 'static>(mut rest: VecDeque<Program<A>>, mut done: Vec<A>) -> Program<Vec<A>> {
    while let Some(program) = rest.pop_front() {
        match program {
            Program::Pure(value) => done.push(value),
            Program::Fail(error) => return Program::Fail(error),
            Program::Step(operation, next) => {
                return Program::Step(
                    operation,
                    Box::new(move |response| {
                        rest.push_front(next(response));
                        resume_sequence(rest, done)
                    }),
                );
            }
        }
    }
    Program::Pure(done)
}

impl Program<Response> {
    /// A program of exactly one operation, yielding the raw response.
    pub fn lift(operation: Operation) -> Self {
        Self::Step(operation, Box::new(Program::Pure))
    }
}

impl<A> fmt::Debug for Program<A>
where
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure(value) => f.debug_tuple("Pure").field(value).finish(),
            Self::Fail(error) => f.debug_tuple("Fail").field(error).finish(),
            Self::Step(operation, _) => f.debug_tuple("Step").field(operation).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Leaf programs
// ---------------------------------------------------------------------------

pub fn get_item(table: impl Into<String>, key: Key, consistent: bool) -> Program<Option<Item>> {
    Program::lift(Operation::GetItem {
        table: table.into(),
        key,
        consistent,
    })
    .try_map(Response::into_item)
}

pub fn put_item(table: impl Into<String>, item: Item, condition: Option<Condition>) -> Program<()> {
    Program::lift(Operation::PutItem {
        table: table.into(),
        item,
        condition,
    })
    .try_map(Response::into_written)
}

pub fn delete_item(table: impl Into<String>, key: Key, condition: Option<Condition>) -> Program<()> {
    Program::lift(Operation::DeleteItem {
        table: table.into(),
        key,
        condition,
    })
    .try_map(Response::into_written)
}

pub fn update_item(
    table: impl Into<String>,
    key: Key,
    update: UpdateExpression,
    condition: Option<Condition>,
) -> Program<Item> {
    Program::lift(Operation::UpdateItem {
        table: table.into(),
        key,
        update,
        condition,
    })
    .try_map(Response::into_updated)
}

pub fn scan(table: impl Into<String>, index: Option<String>, options: QueryOptions) -> Program<PageOutput> {
    Program::lift(Operation::Scan {
        table: table.into(),
        index,
        options,
    })
    .try_map(Response::into_page)
}

pub fn query(
    table: impl Into<String>,
    index: Option<String>,
    key_condition: KeyCondition,
    options: QueryOptions,
) -> Program<PageOutput> {
    Program::lift(Operation::Query {
        table: table.into(),
        index,
        key_condition,
        options,
    })
    .try_map(Response::into_page)
}

pub fn batch_get(table: impl Into<String>, keys: Vec<Key>, consistent: bool) -> Program<BatchGetOutput> {
    Program::lift(Operation::BatchGet {
        table: table.into(),
        keys,
        consistent,
    })
    .try_map(Response::into_batch_get)
}

pub fn batch_write(table: impl Into<String>, writes: Vec<WriteRequest>) -> Program<BatchWriteOutput> {
    Program::lift(Operation::BatchWrite {
        table: table.into(),
        writes,
    })
    .try_map(Response::into_batch_write)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use dynaform_types::WireValue;

    use super::*;
    use crate::error::{InterpreterError, InterpreterResult};

    /// Answers every operation from a fixed script and records what it saw.
    struct Scripted {
        responses: Mutex<Vec<InterpreterResult<Response>>>,
        seen: Mutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<InterpreterResult<Response>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<&'static str> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Interpreter for Scripted {
        fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
            self.seen.lock().unwrap().push(operation.name());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(InterpreterError::Service("script exhausted".into())))
        }
    }

    #[async_trait::async_trait]
    impl AsyncInterpreter for Scripted {
        async fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
            Interpreter::execute(self, operation)
        }
    }

    fn key(id: i64) -> Key {
        Key::from([("id".to_string(), WireValue::number(id))])
    }

    #[test]
    fn building_a_program_executes_nothing() {
        let interp = Scripted::new(vec![]);
        let program = put_item("pets", key(1), None).and_then(|()| get_item("pets", key(1), true));
        assert_eq!(program.pending().map(Operation::name), Some("PutItem"));
        assert!(interp.seen().is_empty());
    }

    #[test]
    fn steps_run_in_order_with_results_threaded_through() {
        let interp = Scripted::new(vec![
            Ok(Response::Written),
            Ok(Response::Item(Some(key(1)))),
        ]);
        let program = put_item("pets", key(1), None)
            .and_then(|()| get_item("pets", key(1), true))
            .map(|found| found.is_some());
        assert_eq!(program.run(&interp), Ok(true));
        assert_eq!(interp.seen(), vec!["PutItem", "GetItem"]);
    }

    #[test]
    fn interpreter_errors_stop_the_program() {
        let interp = Scripted::new(vec![Err(InterpreterError::ConditionalCheckFailed {
            table: "pets".into(),
        })]);
        let program = put_item("pets", key(1), None).and_then(|()| get_item("pets", key(1), true));
        assert_eq!(
            program.run(&interp),
            Err(ProgramError::Interpreter(InterpreterError::ConditionalCheckFailed {
                table: "pets".into()
            }))
        );
        assert_eq!(interp.seen(), vec!["PutItem"]);
    }

    #[test]
    fn wrong_response_kind_is_reported() {
        let interp = Scripted::new(vec![Ok(Response::Written)]);
        let result = get_item("pets", key(1), false).run(&interp);
        assert_eq!(
            result,
            Err(ProgramError::UnexpectedResponse {
                expected: "Item",
                found: "Written"
            })
        );
    }

    #[test]
    fn sequence_collects_in_order() {
        let interp = Scripted::new(vec![
            Ok(Response::Item(None)),
            Ok(Response::Item(Some(key(2)))),
            Ok(Response::Item(None)),
        ]);
        let program = Program::sequence((1..=3).map(|id| get_item("pets", key(id), false)));
        let found = program.run(&interp).unwrap();
        assert_eq!(found, vec![None, Some(key(2)), None]);
        assert_eq!(interp.seen().len(), 3);
    }

    #[test]
    fn pure_and_fail_need_no_interpreter() {
        let interp = Scripted::new(vec![]);
        assert_eq!(Program::pure(3).map(|n| n * 2).run(&interp), Ok(6));
        let failed: Program<i32> = Program::fail(InterpreterError::Service("down".into()));
        assert!(failed.and_then(|n| Program::pure(n + 1)).run(&interp).is_err());
        assert!(interp.seen().is_empty());
    }

    #[tokio::test]
    async fn async_run_follows_the_same_order() {
        let interp = Scripted::new(vec![Ok(Response::Written), Ok(Response::Item(None))]);
        let program = delete_item("pets", key(1), None).and_then(|()| get_item("pets", key(1), true));
        assert_eq!(program.run_async(&interp).await, Ok(None));
        assert_eq!(interp.seen(), vec!["DeleteItem", "GetItem"]);
    }
}
