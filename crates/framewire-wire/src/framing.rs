//! Length-prefixed record framing: `u32_be(len) || payload`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::packet::WireError;

/// Write `payload` as a single length-prefixed record.
///
/// Retries partial writes internally (via `write_all`) until the whole
/// record — length prefix and payload — has been written.
///
/// # Errors
///
/// Returns an error if the underlying write fails.
pub async fn write_packet<W>(writer: &mut W, payload: &[u8]) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u32;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(WireError::Io)?;
    writer.write_all(payload).await.map_err(WireError::Io)?;
    Ok(())
}

/// Read one length-prefixed record's payload bytes.
///
/// Returns `Ok(None)` only on a clean close observed while reading the
/// 4-byte length prefix (zero bytes read). Any other short read is a fatal
/// decode error, not an `EOF`.
///
/// # Errors
///
/// Returns an error if the length prefix or payload bytes are truncated
/// mid-record, or if the underlying read fails.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<Vec<u8>>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match read_exact_or_eof(reader, &mut len_buf).await? {
        ReadOutcome::Eof => return Ok(None),
        ReadOutcome::Full => {}
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(WireError::Io)?;
    Ok(Some(payload))
}

enum ReadOutcome {
    Full,
    Eof,
}

/// Like `read_exact`, but a zero-byte read before any bytes arrive is
/// reported as a clean EOF rather than an error. A short read after at
/// least one byte has arrived remains a fatal error — only a clean close
/// at a record boundary counts as EOF (spec.md §4.1).
async fn read_exact_or_eof<R>(reader: &mut R, buf: &mut [u8]) -> Result<ReadOutcome, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(WireError::Io)?;
        if n == 0 {
            if filled == 0 {
                return Ok(ReadOutcome::Eof);
            }
            return Err(WireError::Truncated {
                expected: buf.len(),
                got: filled,
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = client;
        let mut reader = server;

        let pkt = Packet::Init {
            width: 4,
            height: 2,
        };
        let encoded = pkt.encode().unwrap();
        write_packet(&mut writer, &encoded).await.unwrap();

        let read_back = read_packet(&mut reader).await.unwrap().unwrap();
        assert_eq!(read_back, encoded);
        assert_eq!(Packet::decode(&read_back).unwrap(), pkt);
    }

    #[tokio::test]
    async fn clean_close_before_any_bytes_is_eof() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = server;
        assert!(read_packet(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn multiple_packets_are_framed_independently() {
        let (mut writer, mut reader) = tokio::io::duplex(4096);

        let skip = Packet::Skip.encode().unwrap();
        let heartbeat = Packet::Heartbeat {
            timestamp_millis: 42,
        }
        .encode()
        .unwrap();

        write_packet(&mut writer, &skip).await.unwrap();
        write_packet(&mut writer, &heartbeat).await.unwrap();

        let first = read_packet(&mut reader).await.unwrap().unwrap();
        let second = read_packet(&mut reader).await.unwrap().unwrap();
        assert_eq!(first, skip);
        assert_eq!(second, heartbeat);
    }
}
