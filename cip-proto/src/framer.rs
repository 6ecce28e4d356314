//! Builds request bodies for the individual CIP services this client speaks.
//!
//! Each function here produces a [`Request`], the service code plus path plus service-specific
//! body, ready to be wrapped in whatever encapsulation/CPF framing the `Transport` uses.

use crate::codec::{self, CipType, Value};
use crate::error::DataError;
use crate::path;

pub const SERVICE_GET_ATTRIBUTES: u8 = 0x03;
pub const SERVICE_MULTIPLE: u8 = 0x0A;
pub const SERVICE_READ_TEMPLATE: u8 = 0x4B;
pub const SERVICE_READ_TAG: u8 = 0x4C;
pub const SERVICE_WRITE_TAG: u8 = 0x4D;
pub const SERVICE_READ_MODIFY_WRITE: u8 = 0x4E;
pub const SERVICE_READ_TAG_FRAGMENTED: u8 = 0x52;
pub const SERVICE_WRITE_TAG_FRAGMENTED: u8 = 0x53;
pub const SERVICE_GET_INSTANCE_ATTRIBUTE_LIST: u8 = 0x55;

pub const CLASS_MESSAGE_ROUTER: u8 = 0x02;
pub const CLASS_SYMBOL: u8 = 0x6B;
pub const CLASS_TEMPLATE: u8 = 0x6C;

/// A fully-framed CIP request: service code, EPATH, and service-specific body.
#[derive(Debug, Clone)]
pub struct Request {
    pub service: u8,
    pub path: Vec<u8>,
    pub body: Vec<u8>,
}

impl Request {
    /// Serializes to `<service><path_size_words><path><body>`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.path.len() + self.body.len());
        out.push(self.service);
        out.push((self.path.len() / 2) as u8);
        out.extend_from_slice(&self.path);
        out.extend_from_slice(&self.body);
        out
    }
}

fn class_instance_path(class: u8, instance: u32) -> Vec<u8> {
    let mut path = Vec::with_capacity(6);
    path.push(path::CLASS_8);
    path.push(class);
    path.push(path::INSTANCE_16);
    path.push(0x00);
    path.extend_from_slice(&(instance as u16).to_le_bytes());
    path
}

/// Builds a Read Tag (0x4C) request for a single element.
pub fn read_tag(tag: &str) -> Result<Request, DataError> {
    let path = path::build_request_path(tag, false)
        .ok_or_else(|| DataError::new(DataError::READ, format!("cannot create request path for tag '{}'", tag)))?;
    Ok(Request { service: SERVICE_READ_TAG, path, body: 1u16.to_le_bytes().to_vec() })
}

/// Builds a Read Tag Fragmented (0x52) request starting at `byte_offset`.
pub fn read_tag_fragmented(tag: &str, count: u16, byte_offset: u32) -> Result<Request, DataError> {
    let path = path::build_request_path(tag, false)
        .ok_or_else(|| DataError::new(DataError::ARRAY_READ, format!("cannot create request path for tag '{}'", tag)))?;
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&count.to_le_bytes());
    body.extend_from_slice(&byte_offset.to_le_bytes());
    Ok(Request { service: SERVICE_READ_TAG_FRAGMENTED, path, body })
}

/// Builds a Write Tag (0x4D) request for a single element.
pub fn write_tag(tag: &str, ty: CipType, value: &Value) -> Result<Request, DataError> {
    let path = path::build_request_path(tag, false)
        .ok_or_else(|| DataError::new(DataError::WRITE, format!("cannot create request path for tag '{}'", tag)))?;
    let mut body = Vec::with_capacity(4 + ty.size());
    body.extend_from_slice(&ty.code().to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&codec::pack(ty, value)?);
    Ok(Request { service: SERVICE_WRITE_TAG, path, body })
}

/// Builds a Write Tag Fragmented (0x53) request for a slice of `values` starting at `byte_offset`
/// within a `total_count`-element array.
pub fn write_tag_fragmented(
    tag: &str,
    ty: CipType,
    values: &[Value],
    total_count: u16,
    byte_offset: u32,
) -> Result<Request, DataError> {
    let path = path::build_request_path(tag, false).ok_or_else(|| {
        DataError::new(DataError::ARRAY_WRITE, format!("cannot create request path for tag '{}'", tag))
    })?;
    let mut body = Vec::with_capacity(8 + values.len() * ty.size());
    body.extend_from_slice(&ty.code().to_le_bytes());
    body.extend_from_slice(&total_count.to_le_bytes());
    body.extend_from_slice(&byte_offset.to_le_bytes());
    for v in values {
        body.extend_from_slice(&codec::pack(ty, v)?);
    }
    Ok(Request { service: SERVICE_WRITE_TAG_FRAGMENTED, path, body })
}

/// Builds a Read-Modify-Write (0x4E) request that sets (or clears) bit `bit` of `tag`.
///
/// `mask_size` is 4 bytes when `tag` syntactically indexes a BOOL array (contains `[`), in which
/// case `bit` is normalized modulo 32; otherwise it's the smallest width (1, 2, or 4 bytes) that
/// covers `bit` in an integer host.
pub fn read_modify_write(tag: &str, bit: u32, value: bool) -> Result<Request, DataError> {
    let path = path::build_request_path(tag, false)
        .ok_or_else(|| DataError::new(DataError::WRITE, format!("cannot create request path for tag '{}'", tag)))?;

    let (mask_size, bit) = if tag.contains('[') {
        (4usize, bit % 32)
    } else if bit < 8 {
        (1usize, bit)
    } else if bit < 16 {
        (2usize, bit)
    } else {
        (4usize, bit)
    };

    let mut or_mask = vec![0u8; mask_size];
    let mut and_mask = vec![0xFFu8; mask_size];
    if value {
        or_mask[(bit / 8) as usize] |= 1 << (bit % 8);
    } else {
        and_mask[(bit / 8) as usize] &= !(1 << (bit % 8));
    }

    let mut body = Vec::with_capacity(2 + mask_size * 2);
    body.extend_from_slice(&(mask_size as u16).to_le_bytes());
    body.extend_from_slice(&or_mask);
    body.extend_from_slice(&and_mask);
    Ok(Request { service: SERVICE_READ_MODIFY_WRITE, path, body })
}

/// Builds a Get Instance Attributes List (0x55) request continuing from `last_instance`.
///
/// When `program` is `Some`, an extended symbolic `"Program:<name>"` segment is prepended so the
/// enumeration is scoped to that program instead of the controller.
pub fn get_instance_attributes_list(last_instance: u32, program: Option<&str>) -> Request {
    let mut path = Vec::new();
    if let Some(name) = program {
        path.extend(path::symbolic_segment(&format!("Program:{}", name)));
    }
    path.extend(class_instance_path(CLASS_SYMBOL, last_instance));

    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&2u16.to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&2u16.to_le_bytes());
    Request { service: SERVICE_GET_INSTANCE_ATTRIBUTE_LIST, path, body }
}

/// Builds a Get Attributes request against the Template Object's structure-makeup attributes
/// (4: object definition size, 5: structure size, 2: member count, 1: structure handle).
///
/// The attribute list is encoded explicitly as four distinct 16-bit IDs; the original driver
/// reused its `pack_uint(4)` attribute-count helper as the first attribute ID too, which happens
/// to produce the same bytes but is not done that way here.
pub fn get_structure_makeup(instance_id: u32) -> Request {
    let path = class_instance_path(CLASS_TEMPLATE, instance_id);
    let mut body = Vec::with_capacity(10);
    body.extend_from_slice(&4u16.to_le_bytes());
    for attr in [4u16, 5, 2, 1] {
        body.extend_from_slice(&attr.to_le_bytes());
    }
    Request { service: SERVICE_GET_ATTRIBUTES, path, body }
}

/// Builds a Read Template (0x4B) request for `bytes_to_read` bytes starting at `byte_offset`.
pub fn read_template(instance_id: u32, byte_offset: u32, bytes_to_read: u16) -> Request {
    let path = class_instance_path(CLASS_TEMPLATE, instance_id);
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&byte_offset.to_le_bytes());
    body.extend_from_slice(&bytes_to_read.to_le_bytes());
    Request { service: SERVICE_READ_TEMPLATE, path, body }
}
