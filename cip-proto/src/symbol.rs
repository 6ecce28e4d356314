//! Decodes Get Instance Attributes List replies and classifies each entry into a user-visible
//! `Tag`, a program scope header, or a skip.

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::CipType;
use crate::error::DataError;
use crate::model::{SymbolEntry, Tag};
use crate::reply::{CIP_STATUS_MORE_DATA, CIP_STATUS_SUCCESS};

/// Decodes the repeated `<instance_id:u32><name_len:u16><name:bytes><symbol_type:u16>` records
/// in a Get Instance Attributes List reply payload.
pub fn decode_instance_list(payload: &[u8]) -> Vec<SymbolEntry> {
    let mut out = Vec::new();
    let mut rest = payload;
    while rest.len() >= 6 {
        let instance_id = LittleEndian::read_u32(rest);
        let name_len = LittleEndian::read_u16(&rest[4..]) as usize;
        let name_start = 6;
        let name_end = name_start + name_len;
        if rest.len() < name_end + 2 {
            break;
        }
        let name = String::from_utf8_lossy(&rest[name_start..name_end]).into_owned();
        let symbol_type = LittleEndian::read_u16(&rest[name_end..]);
        out.push(SymbolEntry { instance_id, name, symbol_type });
        rest = &rest[name_end + 2..];
    }
    out
}

/// Outcome of classifying one raw symbol entry.
#[derive(Debug, Clone)]
pub enum Classified {
    /// A user tag, ready to surface to callers (struct tags still need template/UDT resolution).
    Tag(Tag),
    /// A `Program:<name>` scope header; not a tag itself, but names a scope to enumerate.
    ProgramHeader(String),
    /// A system/reserved entry, or a name shape (containing `:` or `__`) that isn't a user tag.
    Skip,
}

/// Classifies one raw symbol entry per the Symbol Object's `symbol_type` bitfield.
pub fn classify(entry: &SymbolEntry) -> Classified {
    if let Some(rest) = entry.name.strip_prefix("Program:") {
        return Classified::ProgramHeader(rest.to_string());
    }
    if entry.name.contains(':') || entry.name.contains("__") {
        return Classified::Skip;
    }
    if entry.is_system() {
        return Classified::Skip;
    }

    let dim = entry.array_dim();
    if entry.is_struct() {
        Classified::Tag(Tag::Struct {
            name: entry.name.clone(),
            instance_id: entry.instance_id,
            dim,
            template_instance_id: entry.template_instance_id(),
            template: None,
            udt: None,
        })
    } else {
        match entry.atomic_type() {
            Some(data_type) => Classified::Tag(Tag::Atomic {
                name: entry.name.clone(),
                instance_id: entry.instance_id,
                dim,
                data_type,
                bit_position: if data_type == CipType::Bool { Some(entry.bool_bit_position()) } else { None },
            }),
            None => Classified::Skip,
        }
    }
}

/// Next state of the symbol-enumeration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationStep {
    Continue(u32),
    Done,
}

/// Advances the enumeration state machine given the CIP general status of the page just
/// received and the highest instance id seen in it.
pub fn next_step(general_status: u8, last_seen_instance: u32) -> Result<EnumerationStep, DataError> {
    match general_status {
        CIP_STATUS_SUCCESS => Ok(EnumerationStep::Done),
        CIP_STATUS_MORE_DATA => Ok(EnumerationStep::Continue(last_seen_instance + 1)),
        other => Err(DataError::new(
            DataError::TAG_LIST,
            format!("unexpected general status 0x{:02X} during symbol enumeration", other),
        )),
    }
}
