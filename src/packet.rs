pub mod connack;
pub mod connect;
pub mod publish;
pub mod suback;
pub mod subscribe;

use crate::constants::masks;
use crate::encoding::{decode_variable_int, encode_variable_int};
use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Control packet types supported by the broker.
///
/// The broker accepts Connect, Publish, Subscribe, `PingReq` and
/// Disconnect from clients and produces `ConnAck`, `SubAck`, `PingResp`
/// and Publish. Every other MQTT 3.1.1 type is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    Subscribe = 8,
    SubAck = 9,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    /// Converts the high nibble of a fixed-header byte to a `PacketType`.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Connect),
            2 => Some(Self::ConnAck),
            3 => Some(Self::Publish),
            8 => Some(Self::Subscribe),
            9 => Some(Self::SubAck),
            12 => Some(Self::PingReq),
            13 => Some(Self::PingResp),
            14 => Some(Self::Disconnect),
            _ => None,
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type as u8
    }
}

/// MQTT packet fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
}

impl FixedHeader {
    /// Creates a new fixed header.
    #[must_use]
    pub fn new(packet_type: PacketType, flags: u8, remaining_length: u32) -> Self {
        Self {
            packet_type,
            flags,
            remaining_length,
        }
    }

    /// Encodes the fixed header.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining length exceeds the
    /// variable-length integer range.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let byte1 = (u8::from(self.packet_type) << 4) | (self.flags & masks::FLAGS);
        buf.put_u8(byte1);
        encode_variable_int(buf, self.remaining_length)?;
        Ok(())
    }

    /// Decodes a fixed header from the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, the packet type is
    /// unknown, or the remaining length is malformed.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "no data for fixed header".to_string(),
            ));
        }

        let byte1 = buf.get_u8();
        let packet_type_val = byte1 >> 4;
        let flags = byte1 & masks::FLAGS;

        let packet_type = PacketType::from_u8(packet_type_val)
            .ok_or(MqttError::InvalidPacketType(packet_type_val))?;

        let remaining_length = decode_variable_int(buf)?;

        Ok(Self {
            packet_type,
            flags,
            remaining_length,
        })
    }

    /// Validates the flag nibble for the packet type.
    ///
    /// PUBLISH carries its own flag semantics (checked during body
    /// decode); SUBSCRIBE requires `0x02`; everything else requires
    /// zero.
    #[must_use]
    pub fn validate_flags(&self) -> bool {
        match self.packet_type {
            PacketType::Publish => true,
            PacketType::Subscribe => self.flags == masks::SUBSCRIBE_FLAGS,
            _ => self.flags == 0,
        }
    }
}

/// Enum over the supported packet kinds.
#[derive(Debug, Clone)]
pub enum Packet {
    Connect(Box<connect::ConnectPacket>),
    ConnAck(connack::ConnAckPacket),
    Publish(publish::PublishPacket),
    Subscribe(subscribe::SubscribePacket),
    SubAck(suback::SubAckPacket),
    PingReq,
    PingResp,
    Disconnect,
}

impl Packet {
    /// Decodes a packet body for an already-parsed fixed header.
    ///
    /// This is the inbound path: only the client-to-broker packet kinds
    /// are accepted here.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid flags, a server-to-client packet
    /// type, or a body that violates the per-type rules.
    pub fn decode<B: Buf>(fixed_header: &FixedHeader, buf: &mut B) -> Result<Self> {
        if !fixed_header.validate_flags() {
            return Err(MqttError::MalformedPacket(format!(
                "invalid flags {:#04x} for {:?}",
                fixed_header.flags, fixed_header.packet_type
            )));
        }

        match fixed_header.packet_type {
            PacketType::Connect => {
                let packet = connect::ConnectPacket::decode_body(buf, fixed_header)?;
                Ok(Packet::Connect(Box::new(packet)))
            }
            PacketType::Publish => {
                let packet = publish::PublishPacket::decode_body(buf, fixed_header)?;
                Ok(Packet::Publish(packet))
            }
            PacketType::Subscribe => {
                let packet = subscribe::SubscribePacket::decode_body(buf, fixed_header)?;
                Ok(Packet::Subscribe(packet))
            }
            PacketType::PingReq => {
                if fixed_header.remaining_length != 0 {
                    return Err(MqttError::MalformedPacket(
                        "PINGREQ with non-zero remaining length".to_string(),
                    ));
                }
                Ok(Packet::PingReq)
            }
            PacketType::Disconnect => {
                if fixed_header.remaining_length != 0 {
                    return Err(MqttError::MalformedPacket(
                        "DISCONNECT with non-zero remaining length".to_string(),
                    ));
                }
                Ok(Packet::Disconnect)
            }
            PacketType::ConnAck | PacketType::SubAck | PacketType::PingResp => {
                Err(MqttError::ProtocolError(format!(
                    "{:?} is not a client packet",
                    fixed_header.packet_type
                )))
            }
        }
    }

    /// Serializes an outbound packet into a ready-to-write frame.
    ///
    /// Only the packet kinds the broker produces can be encoded here.
    ///
    /// # Errors
    ///
    /// Returns an error for inbound-only packet kinds or bodies that
    /// exceed the remaining-length range.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(16);
        match self {
            Packet::ConnAck(p) => p.encode(&mut buf)?,
            Packet::SubAck(p) => p.encode(&mut buf)?,
            Packet::Publish(p) => p.encode(&mut buf)?,
            Packet::PingResp => FixedHeader::new(PacketType::PingResp, 0, 0).encode(&mut buf)?,
            Packet::Connect(_) | Packet::Subscribe(_) | Packet::PingReq | Packet::Disconnect => {
                return Err(MqttError::ProtocolError(
                    "not an outbound packet type".to_string(),
                ))
            }
        }
        Ok(buf.freeze())
    }
}

/// Trait implemented by every packet with a body.
pub trait MqttPacket: Sized {
    /// Returns the packet type.
    fn packet_type(&self) -> PacketType;

    /// Returns the fixed-header flag nibble.
    fn flags(&self) -> u8 {
        0
    }

    /// Encodes the packet body (without the fixed header).
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()>;

    /// Decodes the packet body (without the fixed header).
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self>;

    /// Encodes the complete packet, fixed header included.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let mut body = Vec::new();
        self.encode_body(&mut body)?;

        let fixed_header = FixedHeader::new(
            self.packet_type(),
            self.flags(),
            body.len().try_into().unwrap_or(u32::MAX),
        );

        fixed_header.encode(buf)?;
        buf.put_slice(&body);
        Ok(())
    }
}
