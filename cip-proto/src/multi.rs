//! Encodes and decodes the Multiple Service Packet (service 0x0A), which batches several CIP
//! sub-requests into one send/receive round trip.

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{self, CipType, Value};
use crate::error::DataError;
use crate::framer::{Request, CLASS_MESSAGE_ROUTER, SERVICE_MULTIPLE};
use crate::path;

/// One decoded sub-reply from a Multiple Service Packet response.
#[derive(Debug, Clone)]
pub struct SubReply {
    pub status: u8,
    pub value: Option<(CipType, Value)>,
}

/// Wraps `requests` into a single Multiple Service Packet (0x0A) request addressed to the
/// Message Router (class 0x02, instance 1).
pub fn build(requests: &[Request]) -> Request {
    let mut path = Vec::with_capacity(4);
    path.push(path::CLASS_8);
    path.push(CLASS_MESSAGE_ROUTER);
    path.push(path::INSTANCE_8);
    path.push(1);

    let bodies: Vec<Vec<u8>> = requests.iter().map(Request::to_bytes).collect();

    // offsets are measured from the start of the sub-request count field
    let mut offsets = Vec::with_capacity(bodies.len());
    let mut cursor = 2 + 2 * bodies.len();
    for b in &bodies {
        offsets.push(cursor as u16);
        cursor += b.len();
    }

    let mut body = Vec::with_capacity(cursor);
    body.extend_from_slice(&(bodies.len() as u16).to_le_bytes());
    for off in &offsets {
        body.extend_from_slice(&off.to_le_bytes());
    }
    for b in &bodies {
        body.extend_from_slice(b);
    }

    Request { service: SERVICE_MULTIPLE, path, body }
}

/// Decodes the sub-reply portion of a Multiple Service Packet reply: the count, offset table,
/// and each sub-reply's status/value, in request order.
pub fn decode(bytes: &[u8]) -> Result<Vec<SubReply>, DataError> {
    if bytes.len() < 2 {
        return Err(DataError::new(DataError::STATUS, "multiple service reply too short"));
    }
    let n = LittleEndian::read_u16(bytes) as usize;
    let offsets_end = 2 + n * 2;
    if bytes.len() < offsets_end {
        return Err(DataError::new(DataError::STATUS, "multiple service reply offset table truncated"));
    }

    let offsets: Vec<usize> = (0..n)
        .map(|i| LittleEndian::read_u16(&bytes[2 + i * 2..]) as usize)
        .collect();

    let mut out = Vec::with_capacity(n);
    for (i, &off) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(bytes.len());
        let sub = bytes
            .get(off..end.max(off))
            .ok_or_else(|| DataError::new(DataError::STATUS, format!("sub-reply {} offset out of range", i)))?;
        out.push(decode_sub_reply(sub)?);
    }
    Ok(out)
}

fn decode_sub_reply(bytes: &[u8]) -> Result<SubReply, DataError> {
    if bytes.len() < 4 {
        return Err(DataError::new(DataError::STATUS, "sub-reply header truncated"));
    }
    let status = bytes[2];
    let ext_size = bytes[3] as usize;
    let data_start = 4 + ext_size * 2;

    if status != 0x00 || bytes.len() < data_start + 2 {
        return Ok(SubReply { status, value: None });
    }

    let data = &bytes[data_start..];
    let type_code = LittleEndian::read_u16(data);
    let ty = CipType::from_code(type_code)
        .ok_or_else(|| DataError::new(DataError::STATUS, format!("unknown data type code 0x{:04X} in sub-reply", type_code)))?;
    let value = codec::unpack(ty, &data[2..])?;
    Ok(SubReply { status, value: Some((ty, value)) })
}
