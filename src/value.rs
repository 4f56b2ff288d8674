//! Typed-field extraction from raw message payloads.
//!
//! Watchpoints name a scalar field by byte offset and data type; this module
//! decodes that field into a 32-bit working value. Signed integers are
//! sign-extended, unsigned integers zero-extended, and floats carried as
//! their IEEE-754 bit pattern so the comparator can reinterpret them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scalar type tag for a watched field. Endianness is part of the tag for
/// multi-byte types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Undefined,
    U8,
    I8,
    U16Be,
    U16Le,
    I16Be,
    I16Le,
    U32Be,
    U32Le,
    I32Be,
    I32Le,
    F32Be,
    F32Le,
}

/// Value category a data type decodes into, used to pair a watchpoint with
/// its comparison constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    Unsigned,
    Signed,
    Float,
}

impl DataType {
    /// Field width in bytes; natural alignment equals the width.
    pub fn size(self) -> usize {
        match self {
            DataType::Undefined => 0,
            DataType::U8 | DataType::I8 => 1,
            DataType::U16Be | DataType::U16Le | DataType::I16Be | DataType::I16Le => 2,
            DataType::U32Be
            | DataType::U32Le
            | DataType::I32Be
            | DataType::I32Le
            | DataType::F32Be
            | DataType::F32Le => 4,
        }
    }

    pub fn category(self) -> Option<ValueCategory> {
        match self {
            DataType::Undefined => None,
            DataType::U8 | DataType::U16Be | DataType::U16Le | DataType::U32Be | DataType::U32Le => {
                Some(ValueCategory::Unsigned)
            }
            DataType::I8 | DataType::I16Be | DataType::I16Le | DataType::I32Be | DataType::I32Le => {
                Some(ValueCategory::Signed)
            }
            DataType::F32Be | DataType::F32Le => Some(ValueCategory::Float),
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32Be | DataType::F32Le)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldReadFault {
    #[error("field has undefined data type")]
    UndefinedType,
    #[error("field at offset {offset} ({size} bytes) overruns {len}-byte payload")]
    OutOfBounds {
        offset: usize,
        size: usize,
        len: usize,
    },
    #[error("offset {offset} violates {align}-byte alignment")]
    Misaligned { offset: usize, align: usize },
}

/// Decode one scalar field out of `payload`, widened into 32 bits.
///
/// The offset must be naturally aligned for the declared type and the field
/// must lie entirely within the payload.
pub fn read_field(payload: &[u8], offset: usize, data_type: DataType) -> Result<u32, FieldReadFault> {
    let size = data_type.size();
    if size == 0 {
        return Err(FieldReadFault::UndefinedType);
    }
    if offset % size != 0 {
        return Err(FieldReadFault::Misaligned {
            offset,
            align: size,
        });
    }
    let end = offset.checked_add(size).ok_or(FieldReadFault::OutOfBounds {
        offset,
        size,
        len: payload.len(),
    })?;
    if end > payload.len() {
        return Err(FieldReadFault::OutOfBounds {
            offset,
            size,
            len: payload.len(),
        });
    }

    let bytes = &payload[offset..end];
    let raw = match data_type {
        DataType::Undefined => unreachable!(),
        DataType::U8 => u32::from(bytes[0]),
        DataType::I8 => bytes[0] as i8 as i32 as u32,
        DataType::U16Be => u32::from(u16::from_be_bytes([bytes[0], bytes[1]])),
        DataType::U16Le => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        DataType::I16Be => i16::from_be_bytes([bytes[0], bytes[1]]) as i32 as u32,
        DataType::I16Le => i16::from_le_bytes([bytes[0], bytes[1]]) as i32 as u32,
        DataType::U32Be | DataType::I32Be | DataType::F32Be => {
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
        DataType::U32Le | DataType::I32Le | DataType::F32Le => {
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
    };
    Ok(raw)
}

/// Comparison constant for a watchpoint, tagged by value category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ComparisonValue {
    Unsigned(u32),
    Signed(i32),
    Float(f32),
}

impl ComparisonValue {
    pub fn category(self) -> ValueCategory {
        match self {
            ComparisonValue::Unsigned(_) => ValueCategory::Unsigned,
            ComparisonValue::Signed(_) => ValueCategory::Signed,
            ComparisonValue::Float(_) => ValueCategory::Float,
        }
    }
}
