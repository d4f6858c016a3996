//! Transport layer: capability traits plus the two backends that
//! implement them. The rest of the crate depends only on [`verbs`]'s trait
//! objects, never on a concrete backend module.

mod buffer_pool;
mod device_pool;
pub mod mock;
#[cfg(feature = "hardware")]
pub mod real;
pub mod verbs;

pub use buffer_pool::{BufferPool, BufferSlab, BUFFER_SIZE};
pub use device_pool::DevicePool;
