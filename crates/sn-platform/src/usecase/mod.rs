//! Use Case Infrastructure
//!
//! - `ExecutionContext` - request envelope (request id, caller, deadline)
//! - `PgUnitOfWork` - transaction scope owned by a use-case

pub mod execution_context;
pub mod unit_of_work;

pub use execution_context::ExecutionContext;
pub use unit_of_work::{PgTransaction, PgUnitOfWork};
