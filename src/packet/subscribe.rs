use crate::constants::masks;
use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

/// One requested subscription: a topic filter and the requested QoS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    /// Topic filter, possibly containing `+` or `#` wildcards.
    pub filter: String,
    /// Requested QoS. The broker grants QoS 0 regardless.
    pub qos: u8,
}

/// MQTT SUBSCRIBE packet.
#[derive(Debug, Clone)]
pub struct SubscribePacket {
    /// Packet identifier; never zero.
    pub packet_id: u16,
    /// Requested filters, in request order.
    pub filters: Vec<TopicFilter>,
}

impl MqttPacket for SubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Subscribe
    }

    fn flags(&self) -> u8 {
        masks::SUBSCRIBE_FLAGS
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u16(self.packet_id);
        for filter in &self.filters {
            encode_string(buf, &filter.filter)?;
            buf.put_u8(filter.qos);
        }
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "truncated SUBSCRIBE".to_string(),
            ));
        }

        let packet_id = buf.get_u16();
        if packet_id == 0 {
            return Err(MqttError::MalformedPacket(
                "zero packet identifier".to_string(),
            ));
        }

        // Filter entries consume exactly the rest of the body.
        let mut filters = Vec::new();
        while buf.has_remaining() {
            let filter = decode_string(buf)?;

            if !buf.has_remaining() {
                return Err(MqttError::MalformedPacket(
                    "topic filter without a QoS byte".to_string(),
                ));
            }
            let qos = buf.get_u8();
            if qos > 2 {
                return Err(MqttError::MalformedPacket(format!(
                    "invalid requested QoS {qos}"
                )));
            }

            filters.push(TopicFilter { filter, qos });
        }

        if filters.is_empty() {
            return Err(MqttError::MalformedPacket(
                "SUBSCRIBE with no topic filters".to_string(),
            ));
        }

        Ok(Self { packet_id, filters })
    }
}
