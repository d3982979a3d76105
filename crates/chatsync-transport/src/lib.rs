//! Push-channel transport for the chat synchronization client.
//!
//! Provides:
//! - Wire protocol for inbound broadcast frames (`Envelope`)
//! - `ConnectionManager` - channel ownership and bounded reconnect policy

pub mod channel;
pub mod protocol;

pub use channel::{ChannelHandle, ConnectionManager};
pub use protocol::{Envelope, ProtocolError, decode_frame};
