use crate::constants::masks;
use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

/// MQTT PUBLISH packet.
///
/// Only QoS 0 is supported, so there is no packet identifier. The DUP
/// and RETAIN bits are accepted on the way in and ignored; outbound
/// frames always carry a zero flag nibble.
#[derive(Debug, Clone)]
pub struct PublishPacket {
    /// Topic the message is published to. Never empty, never contains
    /// wildcards on the publishing side.
    pub topic_name: String,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

impl PublishPacket {
    /// Creates a new PUBLISH packet.
    #[must_use]
    pub fn new(topic_name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic_name: topic_name.into(),
            payload: payload.into(),
        }
    }
}

impl MqttPacket for PublishPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Publish
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        encode_string(buf, &self.topic_name)?;
        buf.put_slice(&self.payload);
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self> {
        let qos = (fixed_header.flags & masks::PUBLISH_QOS) >> 1;
        if qos != 0 {
            return Err(MqttError::ProtocolError(format!(
                "QoS {qos} publishes are not supported"
            )));
        }

        let topic_name = decode_string(buf)?;
        if topic_name.is_empty() {
            return Err(MqttError::MalformedPacket(
                "empty topic name".to_string(),
            ));
        }

        // Everything after the topic is the payload.
        let payload = buf.copy_to_bytes(buf.remaining()).to_vec();

        Ok(Self {
            topic_name,
            payload,
        })
    }
}
