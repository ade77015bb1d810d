//! Line-oriented TCP control plane.
//!
//! Clients connect to port 3333 and drive the bridge with CR-terminated
//! commands:
//!
//! ```text
//! client_protocol 1.0     ->  server_protocol 1.0
//! wait_for_card           ->  card_detected <uid>   (when a card appears)
//! exit                    ->  connection closed
//! ```
//!
//! One client is served at a time. The server forwards `wait_for_card` to
//! the reader plane over a command channel and relays the resulting
//! detection event back to the client.

pub mod parser;
pub mod server;

pub use parser::LineBuffer;
pub use server::{ControlServer, ServerConfig, ServerError};

/// Convenience alias for network-plane fallible operations.
pub type Result<T> = std::result::Result<T, ServerError>;
