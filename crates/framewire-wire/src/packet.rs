//! Packet types and their exact wire layouts.
//!
//! All multi-byte integers are big-endian. Compression is DEFLATE with a
//! zlib wrapper at level 1 (fast, not best) — see [`compress`]/[`decompress`].

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

const TYPE_INIT: u8 = 0;
const TYPE_FRAME: u8 = 1;
const TYPE_DIRTY: u8 = 2;
const TYPE_SKIP: u8 = 3;
const TYPE_HEARTBEAT: u8 = 4;

const MAX_RECT_COUNT: usize = 65_535;

/// Half-open axis-aligned dirty rectangle: `left <= x < right`, `top <= y < bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl DirtyRect {
    #[must_use]
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Number of BGRA bytes this rect covers (`w * h * 4`).
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.width() as usize * self.height() as usize * 4
    }

    /// Well-formed iff `0 <= left < right` and `0 <= top < bottom`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.left < self.right && self.top < self.bottom
    }

    /// Well-formed and fully contained within a `w x h` screen.
    #[must_use]
    pub fn fits_within(&self, w: u32, h: u32) -> bool {
        self.is_well_formed() && self.right <= w && self.bottom <= h
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.left.to_be_bytes());
        out.extend_from_slice(&self.top.to_be_bytes());
        out.extend_from_slice(&self.right.to_be_bytes());
        out.extend_from_slice(&self.bottom.to_be_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            left: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
            top: u32::from_be_bytes(buf[4..8].try_into().unwrap()),
            right: u32::from_be_bytes(buf[8..12].try_into().unwrap()),
            bottom: u32::from_be_bytes(buf[12..16].try_into().unwrap()),
        }
    }
}

/// A decoded or pre-encode packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Announces screen geometry once at session start.
    Init { width: u32, height: u32 },
    /// A full BGRA frame, optionally DEFLATE-compressed.
    Frame { compressed: bool, body: Vec<u8> },
    /// An XOR-encoded delta over one or more dirty rects, in list order.
    Dirty {
        compressed: bool,
        rects: Vec<DirtyRect>,
        body: Vec<u8>,
    },
    /// No pixels changed since the previous tick.
    Skip,
    /// Informational liveness marker; discarded by both ends today.
    Heartbeat { timestamp_millis: u64 },
}

impl Packet {
    /// Encode this packet's payload bytes (without the length prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if `rects.len()` exceeds the wire limit or `rects`
    /// is empty for a [`Packet::Dirty`] (use [`Packet::Skip`] instead).
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        match self {
            Packet::Init { width, height } => {
                out.push(TYPE_INIT);
                out.extend_from_slice(&width.to_be_bytes());
                out.extend_from_slice(&height.to_be_bytes());
            }
            Packet::Frame { compressed, body } => {
                out.push(TYPE_FRAME);
                encode_sized_body(&mut out, *compressed, body)?;
            }
            Packet::Dirty {
                compressed,
                rects,
                body,
            } => {
                if rects.is_empty() {
                    return Err(WireError::EmptyDirtyRectList);
                }
                if rects.len() > MAX_RECT_COUNT {
                    return Err(WireError::TooManyRects(rects.len()));
                }
                out.push(TYPE_DIRTY);
                out.push(u8::from(*compressed));
                #[allow(clippy::cast_possible_truncation)]
                out.extend_from_slice(&(rects.len() as u16).to_be_bytes());

                let (original_size, data) = if *compressed {
                    (body.len(), compress(body)?)
                } else {
                    (body.len(), body.clone())
                };
                #[allow(clippy::cast_possible_truncation)]
                out.extend_from_slice(&(original_size as u32).to_be_bytes());
                #[allow(clippy::cast_possible_truncation)]
                out.extend_from_slice(&(data.len() as u32).to_be_bytes());
                for rect in rects {
                    rect.encode(&mut out);
                }
                out.extend_from_slice(&data);
            }
            Packet::Skip => {
                out.push(TYPE_SKIP);
            }
            Packet::Heartbeat { timestamp_millis } => {
                out.push(TYPE_HEARTBEAT);
                out.extend_from_slice(&timestamp_millis.to_be_bytes());
            }
        }
        Ok(out)
    }

    /// Decode a packet from its payload bytes (the bytes following the
    /// 4-byte length prefix read by [`crate::read_packet`]).
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] on truncated payloads, an unknown discriminant,
    /// an ill-formed rect count, or an inflate length mismatch.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let &[discriminant, ref rest @ ..] = data else {
            return Err(WireError::Truncated {
                expected: 1,
                got: data.len(),
            });
        };

        match discriminant {
            TYPE_INIT => {
                require_len(rest, 8)?;
                Ok(Packet::Init {
                    width: u32::from_be_bytes(rest[0..4].try_into().unwrap()),
                    height: u32::from_be_bytes(rest[4..8].try_into().unwrap()),
                })
            }
            TYPE_FRAME => {
                let (compressed, body) = decode_sized_body(rest)?;
                Ok(Packet::Frame { compressed, body })
            }
            TYPE_DIRTY => {
                require_len(rest, 11)?;
                let compressed = rest[0] != 0;
                let rect_count = u16::from_be_bytes(rest[1..3].try_into().unwrap()) as usize;
                let original_size = u32::from_be_bytes(rest[3..7].try_into().unwrap()) as usize;
                let data_size = u32::from_be_bytes(rest[7..11].try_into().unwrap()) as usize;

                if rect_count == 0 {
                    return Err(WireError::EmptyDirtyRectList);
                }
                if rect_count > MAX_RECT_COUNT {
                    return Err(WireError::TooManyRects(rect_count));
                }

                let rects_len = rect_count * 16;
                let rects_start = 11;
                let rects_end = rects_start + rects_len;
                require_len(rest, rects_end + data_size)?;

                let mut rects = Vec::with_capacity(rect_count);
                for i in 0..rect_count {
                    let off = rects_start + i * 16;
                    let rect = DirtyRect::decode(&rest[off..off + 16]);
                    if !rect.is_well_formed() {
                        return Err(WireError::IllFormedRect(rect));
                    }
                    rects.push(rect);
                }

                let raw_body = &rest[rects_end..rects_end + data_size];
                let body = materialize_body(compressed, raw_body, original_size)?;

                Ok(Packet::Dirty {
                    compressed,
                    rects,
                    body,
                })
            }
            TYPE_SKIP => Ok(Packet::Skip),
            TYPE_HEARTBEAT => {
                require_len(rest, 8)?;
                Ok(Packet::Heartbeat {
                    timestamp_millis: u64::from_be_bytes(rest[0..8].try_into().unwrap()),
                })
            }
            other => Err(WireError::UnknownDiscriminant(other)),
        }
    }
}

fn encode_sized_body(out: &mut Vec<u8>, compressed: bool, body: &[u8]) -> Result<(), WireError> {
    out.push(u8::from(compressed));
    let (original_size, data) = if compressed {
        (body.len(), compress(body)?)
    } else {
        (body.len(), body.to_vec())
    };
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(original_size as u32).to_be_bytes());
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&data);
    Ok(())
}

fn decode_sized_body(rest: &[u8]) -> Result<(bool, Vec<u8>), WireError> {
    require_len(rest, 9)?;
    let compressed = rest[0] != 0;
    let original_size = u32::from_be_bytes(rest[1..5].try_into().unwrap()) as usize;
    let data_size = u32::from_be_bytes(rest[5..9].try_into().unwrap()) as usize;
    require_len(rest, 9 + data_size)?;
    let raw_body = &rest[9..9 + data_size];
    let body = materialize_body(compressed, raw_body, original_size)?;
    Ok((compressed, body))
}

fn materialize_body(
    compressed: bool,
    raw_body: &[u8],
    original_size: usize,
) -> Result<Vec<u8>, WireError> {
    if compressed {
        let body = decompress(raw_body)?;
        if body.len() != original_size {
            return Err(WireError::InflateSizeMismatch {
                expected: original_size,
                got: body.len(),
            });
        }
        Ok(body)
    } else {
        if raw_body.len() != original_size {
            return Err(WireError::InflateSizeMismatch {
                expected: original_size,
                got: raw_body.len(),
            });
        }
        Ok(raw_body.to_vec())
    }
}

fn require_len(buf: &[u8], min: usize) -> Result<(), WireError> {
    if buf.len() < min {
        Err(WireError::Truncated {
            expected: min,
            got: buf.len(),
        })
    } else {
        Ok(())
    }
}

/// Compress `data` with DEFLATE (zlib wrapper), level 1.
fn compress(data: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(1));
    encoder.write_all(data).map_err(WireError::Compress)?;
    encoder.finish().map_err(WireError::Compress)
}

/// Inflate a zlib-wrapped DEFLATE stream.
fn decompress(data: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(WireError::Inflate)?;
    Ok(out)
}

/// Errors from encoding or decoding a packet payload.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("truncated packet: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unknown packet discriminant: {0}")]
    UnknownDiscriminant(u8),

    #[error("DIRTY packet with zero rects (use SKIP instead)")]
    EmptyDirtyRectList,

    #[error("rect count {0} exceeds wire limit of {MAX_RECT_COUNT}")]
    TooManyRects(usize),

    #[error("ill-formed rect: {0:?}")]
    IllFormedRect(DirtyRect),

    #[error("inflated body length {got} does not match declared originalSize {expected}")]
    InflateSizeMismatch { expected: usize, got: usize },

    #[error("failed to compress body")]
    Compress(#[source] std::io::Error),

    #[error("failed to inflate body")]
    Inflate(#[source] std::io::Error),

    #[error("I/O error")]
    Io(#[source] std::io::Error),
}
