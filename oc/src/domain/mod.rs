//! Domain types shared by the coordinator, the transports and the workers

mod expression;
mod id;
mod operation;
mod task;

pub use expression::{Expression, ExpressionStatus};
pub use id::{new_id, now_ms};
pub use operation::{Operation, OperationClass, Operator};
pub use task::{Task, TaskOutcome};
