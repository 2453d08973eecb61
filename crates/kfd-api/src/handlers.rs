//! Request handlers.

pub mod health;
pub mod infer;

pub use health::*;
pub use infer::*;
