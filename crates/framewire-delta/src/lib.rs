//! XOR delta encoding and application over captured BGRA frames.
//!
//! Encoding happens against a presenter-side shadow buffer that mirrors
//! exactly what every connected viewer's framebuffer holds after the last
//! packet it was sent; applying happens against that same buffer on the
//! viewer side. As long as both stay in lockstep (see [`encode::DeltaEncoder`]
//! and [`apply::apply_dirty`]), `X = D XOR P` on encode and `F = F XOR X` on
//! apply leave the viewer's framebuffer bit-identical to the presenter's.

pub mod apply;
pub mod encode;

pub use apply::{apply_dirty, apply_full, ApplyError};
pub use encode::{DeltaEncoder, EncodedTick};
