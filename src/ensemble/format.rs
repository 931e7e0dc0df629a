//! Dataset framing and positional field access.
//!
//! Every dataset inside an ensemble frame starts with the same header:
//!
//! | Offset | Field                | Width |
//! |--------|----------------------|-------|
//! | 0      | value type tag       | i32   |
//! | 4      | element count        | i32   |
//! | 8      | element multiplier   | i32   |
//! | 12     | imaginary flag       | i32   |
//! | 16     | name length          | i32   |
//! | 20     | name (NUL padded)    | name length bytes |
//!
//! The payload follows immediately and holds `element_count * element_multiplier`
//! values. Field `i` of a 4-byte payload lives at `header_size(name_len) + 4 * i`.
//! All integers and floats are little-endian.

use crate::{Result, WaveError};
use tracing::trace;

/// Size of the fixed part of a dataset header, before the name.
pub const BASE_HEADER_SIZE: usize = 20;

/// Name length used by every dataset the instrument emits.
pub const NAME_LEN: usize = 8;

/// Width of an i32 or f32 field.
pub const BYTES_IN_FIELD: usize = 4;

/// Marker written in place of a velocity that failed quality screening.
pub const BAD_VELOCITY: f32 = 88.888;

/// Element encoding of a dataset payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Int,
    Byte,
}

impl ValueType {
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            10 => Some(ValueType::Float),
            20 => Some(ValueType::Int),
            50 => Some(ValueType::Byte),
            _ => None,
        }
    }

    pub fn tag(self) -> i32 {
        match self {
            ValueType::Float => 10,
            ValueType::Int => 20,
            ValueType::Byte => 50,
        }
    }

    /// Width in bytes of one payload element.
    pub fn width(self) -> usize {
        match self {
            ValueType::Float | ValueType::Int => BYTES_IN_FIELD,
            ValueType::Byte => 1,
        }
    }
}

/// Size of a dataset header whose name occupies `name_length` bytes.
pub fn header_size(name_length: usize) -> usize {
    BASE_HEADER_SIZE + name_length
}

/// Byte offset of payload field `index` for a standard 8-byte dataset name.
pub fn field_offset(index: usize) -> usize {
    header_size(NAME_LEN) + index * BYTES_IN_FIELD
}

/// Read a little-endian i32 at `offset`.
pub fn read_int32(offset: usize, data: &[u8]) -> Result<i32> {
    Ok(i32::from_le_bytes(read_word(offset, data)?))
}

/// Read a little-endian f32 at `offset`.
pub fn read_float32(offset: usize, data: &[u8]) -> Result<f32> {
    Ok(f32::from_le_bytes(read_word(offset, data)?))
}

fn read_word(offset: usize, data: &[u8]) -> Result<[u8; 4]> {
    let end = offset.checked_add(BYTES_IN_FIELD);
    match end.and_then(|end| data.get(offset..end)) {
        Some(bytes) => Ok([bytes[0], bytes[1], bytes[2], bytes[3]]),
        None => Err(WaveError::OutOfRange { offset, width: BYTES_IN_FIELD, len: data.len() }),
    }
}

pub(crate) fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn push_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        push_f32(out, *value);
    }
}

/// Generic dataset header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHeader {
    pub value_type: ValueType,
    pub element_count: usize,
    pub element_multiplier: usize,
    pub is_imaginary: i32,
    /// Length of the name field on the wire, terminator included.
    pub name_length: usize,
    /// Dataset name with the NUL padding stripped, e.g. `E000010`.
    pub name: String,
}

impl DatasetHeader {
    /// Parse the header at the start of `data`.
    ///
    /// Fails with `MalformedFrame` on an unknown value type, negative counts or
    /// a name running past the end of the buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let relabel = |e: WaveError| e.in_dataset("DatasetHeader");
        let tag = read_int32(0, data).map_err(relabel)?;
        let count = read_int32(4, data).map_err(relabel)?;
        let multiplier = read_int32(8, data).map_err(relabel)?;
        let is_imaginary = read_int32(12, data).map_err(relabel)?;
        let name_len = read_int32(16, data).map_err(relabel)?;

        let value_type = ValueType::from_tag(tag).ok_or_else(|| {
            WaveError::malformed("DatasetHeader", format!("unknown value type tag {}", tag))
        })?;
        if count < 0 || multiplier < 0 || name_len < 0 {
            return Err(WaveError::malformed(
                "DatasetHeader",
                format!(
                    "negative layout: count={}, multiplier={}, name_len={}",
                    count, multiplier, name_len
                ),
            ));
        }

        let name_length = name_len as usize;
        let name_bytes = data.get(BASE_HEADER_SIZE..header_size(name_length)).ok_or_else(|| {
            WaveError::malformed(
                "DatasetHeader",
                format!("name of {} bytes runs past buffer of {} bytes", name_length, data.len()),
            )
        })?;
        let name = extract_null_terminated_string(name_bytes);

        trace!("Dataset header {}: type={:?} count={} x {}", name, value_type, count, multiplier);

        Ok(Self {
            value_type,
            element_count: count as usize,
            element_multiplier: multiplier as usize,
            is_imaginary,
            name_length,
            name,
        })
    }

    /// Serialize a header. `name` is written verbatim and must carry its own
    /// NUL terminator.
    pub fn generate(
        value_type: ValueType,
        element_count: usize,
        element_multiplier: usize,
        name: &str,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(header_size(name.len()));
        push_i32(&mut out, value_type.tag());
        push_i32(&mut out, element_count as i32);
        push_i32(&mut out, element_multiplier as i32);
        push_i32(&mut out, 0);
        push_i32(&mut out, name.len() as i32);
        out.extend_from_slice(name.as_bytes());
        out
    }

    pub fn header_len(&self) -> usize {
        header_size(self.name_length)
    }

    pub fn payload_len(&self) -> usize {
        self.element_count
            .saturating_mul(self.element_multiplier)
            .saturating_mul(self.value_type.width())
    }

    /// Total length of header plus declared payload.
    pub fn dataset_len(&self) -> usize {
        self.header_len().saturating_add(self.payload_len())
    }
}

/// Sequential reader over the 4-byte payload fields of one dataset.
///
/// Reads past the end surface as `MalformedFrame` naming the dataset.
pub(crate) struct FieldCursor<'a> {
    data: &'a [u8],
    offset: usize,
    dataset: &'static str,
}

impl<'a> FieldCursor<'a> {
    pub fn new(data: &'a [u8], header: &DatasetHeader, dataset: &'static str) -> Self {
        Self { data, offset: header.header_len(), dataset }
    }

    pub fn index(&self) -> usize {
        self.offset
    }

    pub fn next_i32(&mut self) -> Result<i32> {
        let value = read_int32(self.offset, self.data).map_err(|e| e.in_dataset(self.dataset))?;
        self.offset += BYTES_IN_FIELD;
        Ok(value)
    }

    pub fn next_f32(&mut self) -> Result<f32> {
        let value = read_float32(self.offset, self.data).map_err(|e| e.in_dataset(self.dataset))?;
        self.offset += BYTES_IN_FIELD;
        Ok(value)
    }

    pub fn next_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        (0..count).map(|_| self.next_f32()).collect()
    }

    /// Raw bytes of the next `len` payload bytes.
    pub fn next_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.saturating_add(len);
        let bytes = self.data.get(self.offset..end).ok_or_else(|| {
            WaveError::malformed(
                self.dataset,
                format!(
                    "{} bytes at offset {} exceed dataset of {} bytes",
                    len,
                    self.offset,
                    self.data.len()
                ),
            )
        })?;
        self.offset = end;
        Ok(bytes)
    }
}

/// Decode a beam count stored as a float field.
pub(crate) fn beam_count(value: f32, dataset: &'static str) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > 64.0 {
        return Err(WaveError::malformed(dataset, format!("invalid beam count {}", value)));
    }
    Ok(value as usize)
}

pub(crate) fn extract_null_terminated_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
