//! Wire-format primitives shared by every packet: the two-byte
//! length-prefixed UTF-8 string and the variable-length integer used for
//! the remaining-length field.

use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut};

/// Maximum value that can be encoded as a variable-length integer
/// (four bytes of seven data bits each).
pub const VARIABLE_INT_MAX: u32 = 268_435_455;

/// Encodes a UTF-8 string with a two-byte big-endian length prefix.
///
/// # Errors
///
/// Returns an error if the string is longer than 65 535 bytes.
pub fn encode_string<B: BufMut>(buf: &mut B, string: &str) -> Result<()> {
    let len = string.len();
    if len > u16::MAX as usize {
        return Err(MqttError::MalformedPacket(format!(
            "string of {len} bytes exceeds the two-byte length prefix"
        )));
    }
    buf.put_u16(len as u16);
    buf.put_slice(string.as_bytes());
    Ok(())
}

/// Decodes a UTF-8 string with a two-byte big-endian length prefix.
///
/// # Errors
///
/// Returns an error if the buffer is too short or the bytes are not
/// valid UTF-8.
pub fn decode_string<B: Buf>(buf: &mut B) -> Result<String> {
    if buf.remaining() < 2 {
        return Err(MqttError::MalformedPacket(
            "insufficient bytes for string length".to_string(),
        ));
    }

    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(MqttError::MalformedPacket(format!(
            "string length {len} exceeds remaining {} bytes",
            buf.remaining()
        )));
    }

    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);

    String::from_utf8(bytes)
        .map_err(|e| MqttError::MalformedPacket(format!("invalid UTF-8 string: {e}")))
}

/// Encodes a value as a variable-length integer (one to four bytes,
/// seven data bits per byte, bit 7 as the continuation bit).
///
/// # Errors
///
/// Returns an error if the value exceeds [`VARIABLE_INT_MAX`].
pub fn encode_variable_int<B: BufMut>(buf: &mut B, value: u32) -> Result<()> {
    if value > VARIABLE_INT_MAX {
        return Err(MqttError::ProtocolError(format!(
            "variable integer value {value} exceeds maximum {VARIABLE_INT_MAX}"
        )));
    }

    let mut val = value;
    loop {
        let mut byte = (val % 128) as u8;
        val /= 128;
        if val > 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if val == 0 {
            break;
        }
    }
    Ok(())
}

/// Decodes a variable-length integer.
///
/// # Errors
///
/// Returns an error if the buffer runs out before the integer
/// terminates, or if a fourth byte still carries the continuation bit.
pub fn decode_variable_int<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut value = 0u32;
    let mut multiplier = 1u32;

    for _ in 0..4 {
        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "truncated variable integer".to_string(),
            ));
        }

        let byte = buf.get_u8();
        value += u32::from(byte & 0x7F) * multiplier;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
        multiplier *= 128;
    }

    Err(MqttError::MalformedPacket(
        "variable integer exceeds four bytes".to_string(),
    ))
}
