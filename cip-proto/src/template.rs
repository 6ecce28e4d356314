//! Parses Template Object replies: the structure-makeup attributes and the concatenated Read
//! Template payload that describes a UDT's member layout and name tokens.
//!
//! Resolving a member's nested template (when its type code doesn't match an atomic type) needs
//! further network round trips, so that step lives in the client; this module only turns bytes
//! into the flat [`RawMember`] records and name/tag strings.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DataError;
use crate::model::Template;

/// Parses the four structure-makeup attributes (object definition size, structure size, member
/// count, structure handle) from a Get Attributes reply payload.
///
/// The payload begins with a 4-byte count/response header the original driver's request
/// incidentally produces; each of the four attributes then follows as `<status:u16><value>`,
/// with a 4-byte value for the first two (UDINT) and a 2-byte value for the last two (UINT).
pub fn parse_structure_makeup(payload: &[u8]) -> Result<Template, DataError> {
    const HEADER_LEN: usize = 4;
    if payload.len() < HEADER_LEN {
        return Err(DataError::new(DataError::STATUS, "structure makeup reply too short"));
    }

    let mut idx = HEADER_LEN;
    let mut object_definition_size = 0u32;
    let mut structure_size = 0u32;
    let mut member_count = 0u16;
    let mut structure_handle = 0u16;

    for (attr_id, width) in [(4u16, 4usize), (5, 4), (2, 2), (1, 2)] {
        if payload.len() < idx + 2 + width {
            return Err(DataError::new(DataError::STATUS, "structure makeup reply truncated"));
        }
        let status = LittleEndian::read_u16(&payload[idx..]);
        idx += 2;
        if status != 0 {
            return Err(DataError::new(
                DataError::STATUS,
                format!("template attribute {} returned status 0x{:04X}", attr_id, status),
            ));
        }
        match attr_id {
            4 => object_definition_size = LittleEndian::read_u32(&payload[idx..]),
            5 => structure_size = LittleEndian::read_u32(&payload[idx..]),
            2 => member_count = LittleEndian::read_u16(&payload[idx..]),
            1 => structure_handle = LittleEndian::read_u16(&payload[idx..]),
            _ => unreachable!(),
        }
        idx += width;
    }

    Ok(Template { object_definition_size, structure_size, member_count, structure_handle: structure_handle as u32 })
}

/// Number of bytes a Read Template fragmentation loop must fetch in total, per the original
/// driver's (undocumented) formula.
pub fn template_byte_count(object_definition_size: u32) -> u32 {
    (object_definition_size * 4).saturating_sub(21)
}

/// One member record from the concatenated Read Template payload, before nested-type resolution.
#[derive(Debug, Clone, Copy)]
pub struct RawMember {
    pub array_size: u16,
    pub type_code: u16,
    pub offset: u32,
}

/// Parses the member table and trailing name-token block of a concatenated Read Template
/// payload, returning `(udt_name, internal_tag_names, members)`.
///
/// Name tokens are NUL-separated; the first one containing `;` names the UDT itself (its prefix
/// before `;`), tokens containing the padding marker `ZZZZZZZZZZ` are discarded, and the
/// remaining alphanumeric tokens are the UDT's internal (non-external) tag names.
pub fn parse_template_bytes(bytes: &[u8], member_count: u16) -> Result<(String, Vec<String>, Vec<RawMember>), DataError> {
    let table_len = member_count as usize * 8;
    if bytes.len() < table_len {
        return Err(DataError::new(DataError::STATUS, "template bytes shorter than the declared member table"));
    }

    let mut members = Vec::with_capacity(member_count as usize);
    for chunk in bytes[..table_len].chunks_exact(8) {
        members.push(RawMember {
            array_size: LittleEndian::read_u16(chunk),
            type_code: LittleEndian::read_u16(&chunk[2..]),
            offset: LittleEndian::read_u32(&chunk[4..]),
        });
    }

    let mut name = None;
    let mut internal_tags = Vec::new();
    for token in bytes[table_len..].split(|&b| b == 0).filter(|t| t.len() > 1) {
        let token = String::from_utf8_lossy(token).into_owned();
        if token.contains("ZZZZZZZZZZ") {
            continue;
        }
        if name.is_none() {
            if let Some(pos) = token.find(';') {
                name = Some(token[..pos].to_string());
                continue;
            }
        }
        if token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            internal_tags.push(token);
        }
    }

    Ok((name.unwrap_or_else(|| "Not a user define structure".to_string()), internal_tags, members))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(status: u16, value: &[u8]) -> Vec<u8> {
        let mut buf = status.to_le_bytes().to_vec();
        buf.extend_from_slice(value);
        buf
    }

    #[test]
    fn parses_structure_makeup_in_requested_order() {
        let mut payload = vec![0u8; 4]; // header
        payload.extend(attr(0, &40u32.to_le_bytes()));
        payload.extend(attr(0, &88u32.to_le_bytes()));
        payload.extend(attr(0, &3u16.to_le_bytes()));
        payload.extend(attr(0, &5u16.to_le_bytes()));

        let t = parse_structure_makeup(&payload).unwrap();
        assert_eq!(t.object_definition_size, 40);
        assert_eq!(t.structure_size, 88);
        assert_eq!(t.member_count, 3);
        assert_eq!(t.structure_handle, 5);
    }

    #[test]
    fn fails_on_nonzero_attribute_status() {
        let mut payload = vec![0u8; 4];
        payload.extend(attr(0x05, &0u32.to_le_bytes()));
        payload.extend(attr(0, &0u32.to_le_bytes()));
        payload.extend(attr(0, &0u16.to_le_bytes()));
        payload.extend(attr(0, &0u16.to_le_bytes()));
        assert!(parse_structure_makeup(&payload).is_err());
    }

    #[test]
    fn parses_members_and_extracts_udt_name_before_semicolon() {
        let mut bytes = Vec::new();
        // one member: array_size=1, type_code=0xC4 (DINT), offset=0
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0xC4u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(b"MyUdt;len=4;");
        bytes.push(0);
        bytes.extend_from_slice(b"Value");
        bytes.push(0);

        let (name, tags, members) = parse_template_bytes(&bytes, 1).unwrap();
        assert_eq!(name, "MyUdt");
        assert_eq!(tags, vec!["Value".to_string()]);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].type_code, 0xC4);
    }

    #[test]
    fn template_byte_count_matches_original_formula() {
        assert_eq!(template_byte_count(40), 40 * 4 - 21);
    }
}
