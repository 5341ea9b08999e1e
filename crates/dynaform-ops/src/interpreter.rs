use std::sync::Arc;

use async_trait::async_trait;

use crate::error::InterpreterResult;
use crate::operation::{Operation, Response};

/// Executes one operation per call against a store connection.
///
/// Implementations own the connection. They translate each operation into
/// exactly one store call and report service failures as
/// [`InterpreterError`](crate::InterpreterError) without reinterpreting them.
pub trait Interpreter: Send + Sync {
    fn execute(&self, operation: &Operation) -> InterpreterResult<Response>;
}

/// Non-blocking counterpart of [`Interpreter`]. Suspension happens only
/// around the store call.
#[async_trait]
pub trait AsyncInterpreter: Send + Sync {
    async fn execute(&self, operation: &Operation) -> InterpreterResult<Response>;
}

impl<I: Interpreter + ?Sized> Interpreter for &I {
    fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
        (**self).execute(operation)
    }
}

impl<I: Interpreter + ?Sized> Interpreter for Arc<I> {
    fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
        (**self).execute(operation)
    }
}

#[async_trait]
impl<I: AsyncInterpreter + ?Sized> AsyncInterpreter for Arc<I> {
    async fn execute(&self, operation: &Operation) -> InterpreterResult<Response> {
        (**self).execute(operation).await
    }
}
