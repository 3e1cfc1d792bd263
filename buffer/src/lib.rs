mod bank;
mod error;
mod packet;
mod ring;

pub use bank::{BufferBank, EnqueueResult, OverflowPolicy};
pub use error::BufferError;
pub use packet::{Batch, Packet, RouteId};
pub use ring::{DEFAULT_CAPACITY, RingBuffer};
