//! Classifies incoming EtherNet/IP encapsulation replies and exposes the CIP-layer status and
//! service payload, and decodes the generic fragmented-read payload shape shared by several
//! services.

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{self, CipType, Value};
use crate::error::DataError;

/// Encapsulation command codes this client issues.
pub const ENCAP_SEND_RR_DATA: u16 = 0x6F;
pub const ENCAP_SEND_UNIT_DATA: u16 = 0x70;

/// CIP general status: request succeeded, nothing more to fetch.
pub const CIP_STATUS_SUCCESS: u8 = 0x00;
/// CIP general status: partial reply, continue with an updated offset.
pub const CIP_STATUS_MORE_DATA: u8 = 0x06;

const ENCAPSULATION_STATUS_OFFSET: usize = 8;
const ENCAPSULATION_COMMAND_OFFSET: usize = 0;
/// Offset of the CIP general status inside a `send_rr_data` reply.
const RR_DATA_STATUS_OFFSET: usize = 42;
/// Offset of the CIP reply-service opcode inside a `send_unit_data` reply.
const UNIT_DATA_SERVICE_OFFSET: usize = 46;
/// Offset of the CIP general status inside a `send_unit_data` reply.
const UNIT_DATA_STATUS_OFFSET: usize = 48;
/// Offset where service-specific reply data begins inside a `send_unit_data` reply.
const UNIT_DATA_PAYLOAD_OFFSET: usize = 50;

/// A classified CIP reply: the general status, the reply-service opcode (when known), and the
/// service-specific payload that follows the status/extended-status bytes.
#[derive(Debug, Clone)]
pub struct Reply<'a> {
    pub general_status: u8,
    pub reply_service: Option<u8>,
    pub payload: &'a [u8],
}

/// Classifies a raw encapsulation reply buffer.
///
/// Fails if the encapsulation status is non-zero, the command is neither `send_rr_data` nor
/// `send_unit_data`, or the buffer is too short to contain the header fields it claims to.
pub fn classify(reply: &[u8]) -> Result<Reply, DataError> {
    if reply.len() < ENCAPSULATION_STATUS_OFFSET + 4 {
        return Err(DataError::new(DataError::STATUS, "reply too short to contain an encapsulation header"));
    }

    let encap_status = LittleEndian::read_u32(&reply[ENCAPSULATION_STATUS_OFFSET..]);
    if encap_status != 0 {
        return Err(DataError::new(DataError::STATUS, format!("encapsulation status 0x{:08X}", encap_status)));
    }

    let command = LittleEndian::read_u16(&reply[ENCAPSULATION_COMMAND_OFFSET..]);
    match command {
        ENCAP_SEND_RR_DATA => {
            if reply.len() <= RR_DATA_STATUS_OFFSET {
                return Err(DataError::new(DataError::STATUS, "send_rr_data reply truncated before CIP status"));
            }
            Ok(Reply {
                general_status: reply[RR_DATA_STATUS_OFFSET],
                reply_service: None,
                payload: &reply[RR_DATA_STATUS_OFFSET + 1..],
            })
        }
        ENCAP_SEND_UNIT_DATA => {
            if reply.len() <= UNIT_DATA_STATUS_OFFSET {
                return Err(DataError::new(DataError::STATUS, "send_unit_data reply truncated before CIP status"));
            }
            Ok(Reply {
                general_status: reply[UNIT_DATA_STATUS_OFFSET],
                reply_service: Some(reply[UNIT_DATA_SERVICE_OFFSET]),
                payload: &reply[UNIT_DATA_PAYLOAD_OFFSET.min(reply.len())..],
            })
        }
        other => Err(DataError::new(DataError::STATUS, format!("unexpected encapsulation command 0x{:04X}", other))),
    }
}

pub fn is_more(status: u8) -> bool {
    status == CIP_STATUS_MORE_DATA
}

pub fn is_success(status: u8) -> bool {
    status == CIP_STATUS_SUCCESS
}

/// Decodes a fragmented-read payload shaped `<data_type:u16><value>*`, as returned by Read Tag
/// Fragmented (and the value portion of a plain Read Tag reply, which has exactly one value).
///
/// Stops decoding once fewer than one whole element remains; trailing partial bytes (which
/// shouldn't occur on a well-formed reply) are silently dropped rather than treated as an error.
pub fn decode_values(payload: &[u8]) -> Result<(CipType, Vec<Value>), DataError> {
    if payload.len() < 2 {
        return Err(DataError::new(DataError::FRAGMENT, "reply missing data type field"));
    }
    let type_code = LittleEndian::read_u16(payload);
    let ty = CipType::from_code(type_code)
        .ok_or_else(|| DataError::new(DataError::FRAGMENT, format!("unknown data type code 0x{:04X}", type_code)))?;

    let mut values = Vec::new();
    let mut rest = &payload[2..];
    while rest.len() >= ty.size() {
        values.push(codec::unpack(ty, rest)?);
        rest = &rest[ty.size()..];
    }
    Ok((ty, values))
}
