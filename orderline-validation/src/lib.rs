//! Orderline Validation
//!
//! Semantic checks applied to every decoded order before it is persisted.
//! The validator holds no state and is safe to share across tasks.

mod rules;
mod validator;

pub use rules::parse_address;
pub use validator::OrderValidator;
