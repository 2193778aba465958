//! Wire protocol for framewire: packet types, framing, and (de)serialization.
//!
//! Every packet is transmitted as a 4-byte big-endian length prefix followed
//! by exactly that many payload bytes (see [`framing`]). Payload layouts are
//! defined in [`packet`].

pub mod framing;
pub mod packet;

pub use framing::{read_packet, write_packet};
pub use packet::{DirtyRect, Packet, WireError};
