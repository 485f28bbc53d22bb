use crate::constants::{masks, PROTOCOL_LEVEL, PROTOCOL_NAME};
use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

/// MQTT CONNECT packet.
#[derive(Debug, Clone)]
pub struct ConnectPacket {
    /// Protocol level; always 4 (MQTT 3.1.1) after a successful decode.
    pub protocol_level: u8,
    /// Clean session flag.
    pub clean_session: bool,
    /// Keep alive interval in seconds. Parsed but not enforced.
    pub keep_alive: u16,
    /// Client identifier.
    pub client_id: String,
    /// Reserved; the username connect flag is ignored and the field is
    /// never populated.
    pub username: Option<String>,
    /// Reserved; the password connect flag is ignored and the field is
    /// never populated.
    pub password: Option<Vec<u8>>,
}

impl ConnectPacket {
    /// Creates a new CONNECT packet for the given client id.
    #[must_use]
    pub fn new(client_id: impl Into<String>, clean_session: bool, keep_alive: u16) -> Self {
        Self {
            protocol_level: PROTOCOL_LEVEL,
            clean_session,
            keep_alive,
            client_id: client_id.into(),
            username: None,
            password: None,
        }
    }
}

impl MqttPacket for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        encode_string(buf, PROTOCOL_NAME)?;
        buf.put_u8(self.protocol_level);

        let mut connect_flags = 0u8;
        if self.clean_session {
            connect_flags |= masks::CLEAN_SESSION;
        }
        buf.put_u8(connect_flags);

        buf.put_u16(self.keep_alive);
        encode_string(buf, &self.client_id)?;
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        let protocol_name = decode_string(buf)?;
        if protocol_name != PROTOCOL_NAME {
            return Err(MqttError::ProtocolError(format!(
                "unsupported protocol name {protocol_name:?}"
            )));
        }

        if buf.remaining() < 4 {
            return Err(MqttError::MalformedPacket(
                "truncated CONNECT variable header".to_string(),
            ));
        }

        let protocol_level = buf.get_u8();
        if protocol_level != PROTOCOL_LEVEL {
            return Err(MqttError::ProtocolError(format!(
                "unsupported protocol level {protocol_level}"
            )));
        }

        let connect_flags = buf.get_u8();
        if connect_flags & masks::CONNECT_RESERVED != 0 {
            return Err(MqttError::MalformedPacket(
                "reserved connect flag must be zero".to_string(),
            ));
        }
        // Bits above clean-session (will, username, password) are
        // ignored; a client that sets them ends up with unparsed payload
        // bytes, caught by the trailing-bytes check below.
        let clean_session = connect_flags & masks::CLEAN_SESSION != 0;

        let keep_alive = buf.get_u16();

        let client_id = decode_string(buf)?;
        if client_id.is_empty() && !clean_session {
            return Err(MqttError::ProtocolError(
                "empty client id requires clean session".to_string(),
            ));
        }

        if buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "trailing bytes after CONNECT payload".to_string(),
            ));
        }

        Ok(Self {
            protocol_level,
            clean_session,
            keep_alive,
            client_id,
            username: None,
            password: None,
        })
    }
}
