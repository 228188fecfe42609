//! Request handlers.

pub mod compile;
pub mod health;
pub mod quotes;

pub use compile::*;
pub use health::*;
pub use quotes::*;
