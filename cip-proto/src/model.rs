//! Shared data model produced by symbol and template discovery.

use crate::codec::CipType;

/// One entry from the Symbol Object (controller tag directory), decoded but not yet classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub instance_id: u32,
    pub name: String,
    pub symbol_type: u16,
}

impl SymbolEntry {
    pub fn is_struct(&self) -> bool {
        self.symbol_type & 0x8000 != 0
    }

    pub fn array_dim(&self) -> u8 {
        ((self.symbol_type >> 13) & 0b11) as u8
    }

    pub fn is_system(&self) -> bool {
        self.symbol_type & 0x1000 != 0
    }

    pub fn template_instance_id(&self) -> u16 {
        self.symbol_type & 0x0FFF
    }

    pub fn atomic_type(&self) -> Option<CipType> {
        CipType::from_code(self.symbol_type & 0x00FF)
    }

    pub fn bool_bit_position(&self) -> u8 {
        ((self.symbol_type >> 8) & 0b111) as u8
    }
}

/// A classified, user-visible tag discovered through symbol enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Tag {
    Atomic {
        name: String,
        instance_id: u32,
        dim: u8,
        data_type: CipType,
        bit_position: Option<u8>,
    },
    Struct {
        name: String,
        instance_id: u32,
        dim: u8,
        template_instance_id: u16,
        template: Option<Template>,
        udt: Option<UdtDescriptor>,
    },
}

impl Tag {
    pub fn name(&self) -> &str {
        match self {
            Tag::Atomic { name, .. } | Tag::Struct { name, .. } => name,
        }
    }
}

/// The Template Object's structure-makeup attributes for one UDT instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Template {
    pub object_definition_size: u32,
    pub structure_size: u32,
    pub member_count: u16,
    pub structure_handle: u32,
}

/// One member of a reconstructed UDT layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdtMember {
    pub array_size: u16,
    pub member_type: MemberType,
    pub offset: u32,
}

/// The resolved type of a UDT member: an atomic type, a nested structure, or unresolved (the
/// member's template couldn't be retrieved or recursed into).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemberType {
    Atomic(CipType),
    Struct(Box<UdtDescriptor>),
    None,
}

/// A fully reconstructed user-defined type layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdtDescriptor {
    pub name: String,
    pub internal_tags: Vec<String>,
    pub members: Vec<UdtMember>,
}
