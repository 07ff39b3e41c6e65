//! Logging abstractions
//!
//! Components receive an `Arc<dyn Logger>` at construction time instead of
//! reaching for a global logger.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{preview, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{LogLevel, MemoryLogger};
