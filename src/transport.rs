//! Framed packet reading over an async byte stream.
//!
//! A packet on the wire is a fixed-header byte, a variable-length
//! remaining-length integer, and exactly that many body bytes. The
//! reader pulls the header byte by byte (the length is self-delimiting),
//! then the body in one exact read.

use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, Packet};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads one complete packet from `reader`.
///
/// `max_packet_size` bounds the remaining length before the body is
/// allocated.
///
/// # Errors
///
/// Returns [`MqttError::ConnectionClosed`] on a clean EOF at a packet
/// boundary, and a decode error for malformed framing, an unknown or
/// server-to-client packet type, an oversized packet, or a body that
/// violates the per-type rules.
pub async fn read_packet<R>(reader: &mut R, max_packet_size: usize) -> Result<Packet>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = BytesMut::with_capacity(5);
    let mut byte = [0u8; 1];

    // Packet type and flags.
    let n = reader.read(&mut byte).await?;
    if n == 0 {
        return Err(MqttError::ConnectionClosed);
    }
    header_buf.put_u8(byte[0]);

    // Remaining length, at most four bytes.
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(MqttError::ConnectionClosed);
        }
        header_buf.put_u8(byte[0]);

        if byte[0] & 0x80 == 0 {
            break;
        }

        if header_buf.len() > 4 {
            return Err(MqttError::MalformedPacket(
                "remaining length exceeds four bytes".to_string(),
            ));
        }
    }

    let mut header_buf = header_buf.freeze();
    let fixed_header = FixedHeader::decode(&mut header_buf)?;

    let remaining_length = fixed_header.remaining_length as usize;
    if remaining_length > max_packet_size {
        return Err(MqttError::PacketTooLarge {
            size: remaining_length,
            max: max_packet_size,
        });
    }

    let mut body = vec![0u8; remaining_length];
    reader.read_exact(&mut body).await?;

    let mut body_buf = BytesMut::from(&body[..]);
    Packet::decode(&fixed_header, &mut body_buf)
}
