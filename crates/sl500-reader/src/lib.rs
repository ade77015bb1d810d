//! SL500 reader plane: typed commands, the serial endpoint, and the bridge
//! core that polls the reader while servicing waits from the network plane.
//!
//! # Architecture
//!
//! ```text
//! network plane ──BridgeCommand──> ReaderContext ──Sl500Codec──> serial endpoint
//!               <──BridgeEvent───      │
//!                                      └── 100 ms poll tick (request/anticoll,
//!                                          LEDs, beeper)
//! ```
//!
//! The reader context is a single cooperative task: the poller tick and the
//! command handler interleave through `tokio::select!`, so only one frame
//! exchange is ever in flight on the serial endpoint.

pub mod bridge;
pub mod mock;
pub mod reader;
pub mod serial;

pub use bridge::{ReaderContext, ReaderState};
pub use reader::Sl500;
pub use serial::{LineControl, open_endpoint};
