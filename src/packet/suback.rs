use crate::constants::GRANTED_QOS_0;
use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

/// MQTT SUBACK packet.
#[derive(Debug, Clone)]
pub struct SubAckPacket {
    /// Packet identifier echoed from the SUBSCRIBE.
    pub packet_id: u16,
    /// One return code per requested filter, in request order.
    pub return_codes: Vec<u8>,
}

impl SubAckPacket {
    /// Creates a SUBACK granting QoS 0 for `count` filters.
    #[must_use]
    pub fn granted(packet_id: u16, count: usize) -> Self {
        Self {
            packet_id,
            return_codes: vec![GRANTED_QOS_0; count],
        }
    }
}

impl MqttPacket for SubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::SubAck
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u16(self.packet_id);
        buf.put_slice(&self.return_codes);
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket("truncated SUBACK".to_string()));
        }
        let packet_id = buf.get_u16();
        let return_codes = buf.copy_to_bytes(buf.remaining()).to_vec();
        Ok(Self {
            packet_id,
            return_codes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_encode_single_grant() {
        let packet = SubAckPacket::granted(1, 1);

        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x90, 0x03, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_multiple_grants() {
        let packet = SubAckPacket::granted(0x0102, 3);

        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x90, 0x05, 0x01, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_round_trip() {
        let packet = SubAckPacket::granted(9, 2);

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();

        let fixed_header = FixedHeader::new(PacketType::SubAck, 0, buf.len() as u32);
        let decoded = SubAckPacket::decode_body(&mut buf, &fixed_header).unwrap();
        assert_eq!(decoded.packet_id, 9);
        assert_eq!(decoded.return_codes, vec![0x00, 0x00]);
    }
}
