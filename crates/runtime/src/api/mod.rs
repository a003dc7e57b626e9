//! Types downstream clients interact with.
mod errors;
mod handle;
mod providers;

pub use errors::{Result, RuntimeError};
pub use handle::RuntimeHandle;
pub use providers::{InputProvider, NullInputProvider, QueueInputProvider};
