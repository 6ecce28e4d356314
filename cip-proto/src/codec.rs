//! Packing and unpacking of CIP atomic data types.
//!
//! All CIP wire data is little-endian, unlike most network protocols. This module is the single
//! place that knows the byte width, wire type code, and pack/unpack logic for each atomic type.

use byteorder::{ByteOrder, LittleEndian};
use num_traits::FromPrimitive;

use crate::error::DataError;

/// An atomic CIP data type, identified on the wire by a one- or two-byte type code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
pub enum CipType {
    Bool = 0xC1,
    Sint = 0xC2,
    Int = 0xC3,
    Dint = 0xC4,
    Lint = 0xC5,
    Real = 0xCA,
    Byte = 0xD1,
    Word = 0xD2,
    Dword = 0xD3,
    Lword = 0xD4,
}

impl CipType {
    /// Looks up the type for a wire type code (`I_DATA_TYPE`).
    pub fn from_code(code: u16) -> Option<Self> {
        CipType::from_u16(code & 0x00FF)
    }

    /// The wire type code for this type (`S_DATA_TYPE`).
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Size of one value of this type, in bytes.
    pub fn size(self) -> usize {
        match self {
            CipType::Bool | CipType::Sint | CipType::Byte => 1,
            CipType::Int | CipType::Word => 2,
            CipType::Dint | CipType::Real | CipType::Dword => 4,
            CipType::Lint | CipType::Lword => 8,
        }
    }

    /// Number of bits in one value of this type, used to validate a BOOL-as-bit position.
    pub fn bits(self) -> u32 {
        self.size() as u32 * 8
    }

    /// Human-readable type name as reported by `pycomm`-style clients (`"DINT"`, `"REAL"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            CipType::Bool => "BOOL",
            CipType::Sint => "SINT",
            CipType::Int => "INT",
            CipType::Dint => "DINT",
            CipType::Lint => "LINT",
            CipType::Real => "REAL",
            CipType::Byte => "BYTE",
            CipType::Word => "WORD",
            CipType::Dword => "DWORD",
            CipType::Lword => "LWORD",
        }
    }
}

/// A decoded CIP value, tagged with the type it was decoded as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Sint(i8),
    Int(i16),
    Dint(i32),
    Lint(i64),
    Real(f32),
    Byte(u8),
    Word(u16),
    Dword(u32),
    Lword(u64),
}

impl Value {
    pub fn cip_type(&self) -> CipType {
        match self {
            Value::Bool(_) => CipType::Bool,
            Value::Sint(_) => CipType::Sint,
            Value::Int(_) => CipType::Int,
            Value::Dint(_) => CipType::Dint,
            Value::Lint(_) => CipType::Lint,
            Value::Real(_) => CipType::Real,
            Value::Byte(_) => CipType::Byte,
            Value::Word(_) => CipType::Word,
            Value::Dword(_) => CipType::Dword,
            Value::Lword(_) => CipType::Lword,
        }
    }

    /// Interprets this value as a 64-bit signed integer, for bit-level operations.
    ///
    /// Returns `None` for `Real`, which has no meaningful integer host representation.
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Value::Bool(b) => b as i64,
            Value::Sint(v) => v as i64,
            Value::Int(v) => v as i64,
            Value::Dint(v) => v as i64,
            Value::Lint(v) => v,
            Value::Byte(v) => v as i64,
            Value::Word(v) => v as i64,
            Value::Dword(v) => v as i64,
            Value::Lword(v) => v as i64,
            Value::Real(_) => return None,
        })
    }
}

/// Packs a single value of `ty` into little-endian wire bytes.
pub fn pack(ty: CipType, value: &Value) -> Result<Vec<u8>, DataError> {
    if value.cip_type() != ty {
        return Err(DataError::new(
            DataError::ENCODING,
            format!("value of type {} does not match declared type {}", value.cip_type().name(), ty.name()),
        ));
    }

    let mut buf = vec![0u8; ty.size()];
    match *value {
        Value::Bool(v) => buf[0] = v as u8,
        Value::Sint(v) => buf[0] = v as u8,
        Value::Int(v) => LittleEndian::write_i16(&mut buf, v),
        Value::Dint(v) => LittleEndian::write_i32(&mut buf, v),
        Value::Lint(v) => LittleEndian::write_i64(&mut buf, v),
        Value::Real(v) => LittleEndian::write_f32(&mut buf, v),
        Value::Byte(v) => buf[0] = v,
        Value::Word(v) => LittleEndian::write_u16(&mut buf, v),
        Value::Dword(v) => LittleEndian::write_u32(&mut buf, v),
        Value::Lword(v) => LittleEndian::write_u64(&mut buf, v),
    }
    Ok(buf)
}

/// Unpacks a single value of `ty` from the start of `bytes`.
///
/// Returns an error if fewer than `ty.size()` bytes are available.
pub fn unpack(ty: CipType, bytes: &[u8]) -> Result<Value, DataError> {
    if bytes.len() < ty.size() {
        return Err(DataError::new(
            DataError::ENCODING,
            format!("not enough bytes to decode a {} ({} available, {} needed)", ty.name(), bytes.len(), ty.size()),
        ));
    }

    Ok(match ty {
        CipType::Bool => Value::Bool(bytes[0] != 0),
        CipType::Sint => Value::Sint(bytes[0] as i8),
        CipType::Int => Value::Int(LittleEndian::read_i16(bytes)),
        CipType::Dint => Value::Dint(LittleEndian::read_i32(bytes)),
        CipType::Lint => Value::Lint(LittleEndian::read_i64(bytes)),
        CipType::Real => Value::Real(LittleEndian::read_f32(bytes)),
        CipType::Byte => Value::Byte(bytes[0]),
        CipType::Word => Value::Word(LittleEndian::read_u16(bytes)),
        CipType::Dword => Value::Dword(LittleEndian::read_u32(bytes)),
        CipType::Lword => Value::Lword(LittleEndian::read_u64(bytes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_atomic_type() {
        let samples = [
            Value::Bool(true),
            Value::Sint(-12),
            Value::Int(-4242),
            Value::Dint(123_456_789),
            Value::Lint(-9_000_000_000),
            Value::Real(3.5),
            Value::Byte(0xAB),
            Value::Word(0xBEEF),
            Value::Dword(0xDEAD_BEEF),
            Value::Lword(0xDEAD_BEEF_0000_0001),
        ];

        for v in &samples {
            let ty = v.cip_type();
            let bytes = pack(ty, v).unwrap();
            assert_eq!(bytes.len(), ty.size());
            let back = unpack(ty, &bytes).unwrap();
            assert_eq!(&back, v);
        }
    }

    #[test]
    fn from_code_masks_struct_bits() {
        // A DINT symbol_type with array-dim bits set should still resolve to Dint.
        assert_eq!(CipType::from_code(0xC4), Some(CipType::Dint));
        assert_eq!(CipType::from_code(0x20C4), Some(CipType::Dint));
    }

    #[test]
    fn unpack_rejects_short_buffers() {
        assert!(unpack(CipType::Dint, &[1, 2]).is_err());
    }
}
