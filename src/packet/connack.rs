use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

/// MQTT CONNACK packet.
#[derive(Debug, Clone, Copy)]
pub struct ConnAckPacket {
    /// Session present flag. Always false here: no session state
    /// survives a disconnect.
    pub session_present: bool,
    /// Connect return code.
    pub return_code: u8,
}

impl ConnAckPacket {
    /// Creates a new CONNACK packet.
    #[must_use]
    pub fn new(session_present: bool, return_code: u8) -> Self {
        Self {
            session_present,
            return_code,
        }
    }
}

impl MqttPacket for ConnAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::ConnAck
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u8(u8::from(self.session_present));
        buf.put_u8(self.return_code);
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "truncated CONNACK".to_string(),
            ));
        }
        let session_present = buf.get_u8() & 0x01 != 0;
        let return_code = buf.get_u8();
        Ok(Self {
            session_present,
            return_code,
        })
    }
}
