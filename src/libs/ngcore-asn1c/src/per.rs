//! Aligned PER (APER) bit codec
//!
//! The subset of ITU-T X.691 needed to walk an NGAP-PDU: constrained and
//! unconstrained whole numbers, length determinants, ENUMERATED, CHOICE
//! indices, OCTET/BIT STRING and open types.

use bitvec::prelude::*;
use bytes::Bytes;
use thiserror::Error;

/// PER codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerError {
    #[error("Buffer underflow: need {needed} bits, have {available}")]
    BufferUnderflow { needed: usize, available: usize },
    #[error("Value {value} outside constraint {min}..={max}")]
    ConstraintViolation { value: i64, min: i64, max: i64 },
    #[error("Invalid choice index: {index} (max {max})")]
    InvalidChoiceIndex { index: usize, max: usize },
    #[error("Invalid length: {length}")]
    InvalidLength { length: usize },
    #[error("Extension present where none is supported")]
    UnsupportedExtension,
    #[error("Fragmented length determinant not supported")]
    FragmentedLength,
    #[error("Decode error: {0}")]
    DecodeError(String),
}

pub type PerResult<T> = Result<T, PerError>;

/// Value range of a constrained INTEGER, ENUMERATED or length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub min: i64,
    pub max: i64,
    pub extensible: bool,
}

impl Constraint {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max, extensible: false }
    }

    pub const fn extensible(min: i64, max: i64) -> Self {
        Self { min, max, extensible: true }
    }

    /// Number of distinct values in the root
    pub fn range(&self) -> u64 {
        if self.max < self.min {
            return 0;
        }
        (self.max - self.min) as u64 + 1
    }

    /// Bits of a bit-field large enough for `range() - 1`
    pub fn bits_needed(&self) -> usize {
        match self.range() {
            0 | 1 => 0,
            r => 64 - (r - 1).leading_zeros() as usize,
        }
    }

    fn check(&self, value: i64) -> PerResult<()> {
        if value < self.min || value > self.max {
            return Err(PerError::ConstraintViolation {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Layout of a constrained whole number per X.691 12.2
enum Width {
    Empty,
    BitField(usize),
    AlignedOctets(usize),
    Unconstrained,
}

fn width_of(constraint: &Constraint) -> Width {
    match constraint.range() {
        0 | 1 => Width::Empty,
        2..=255 => Width::BitField(constraint.bits_needed()),
        256 => Width::AlignedOctets(1),
        257..=65536 => Width::AlignedOctets(2),
        _ => Width::Unconstrained,
    }
}

/// APER encoder writing MSB-first into a growable bit buffer
#[derive(Default)]
pub struct AperEncoder {
    bits: BitVec<u8, Msb0>,
}

impl AperEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_position(&self) -> usize {
        self.bits.len()
    }

    /// Pads to the next octet boundary and returns the encoded bytes
    pub fn into_bytes(mut self) -> Bytes {
        self.align();
        Bytes::from(self.bits.into_vec())
    }

    pub fn align(&mut self) {
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn write_bits(&mut self, value: u64, width: usize) {
        for shift in (0..width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_bits(b as u64, 8);
        }
    }

    pub fn encode_constrained_whole_number(
        &mut self,
        value: i64,
        constraint: &Constraint,
    ) -> PerResult<()> {
        constraint.check(value)?;
        let offset = (value - constraint.min) as u64;
        match width_of(constraint) {
            Width::Empty => {}
            Width::BitField(n) => self.write_bits(offset, n),
            Width::AlignedOctets(n) => {
                self.align();
                self.write_bits(offset, n * 8);
            }
            Width::Unconstrained => self.encode_unconstrained_whole_number(value)?,
        }
        Ok(())
    }

    /// Minimal two's-complement octets prefixed with a length determinant
    pub fn encode_unconstrained_whole_number(&mut self, value: i64) -> PerResult<()> {
        let raw = value.to_be_bytes();
        let mut start = 0;
        while start < raw.len() - 1 {
            let redundant = (raw[start] == 0x00 && raw[start + 1] & 0x80 == 0)
                || (raw[start] == 0xFF && raw[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        let octets = &raw[start..];
        self.encode_length_determinant(octets.len())?;
        self.write_bytes(octets);
        Ok(())
    }

    /// Unconstrained length determinant (X.691 11.9.3.6/7). Lengths of 16K
    /// and above need fragmented contents and are rejected.
    pub fn encode_length_determinant(&mut self, length: usize) -> PerResult<()> {
        self.align();
        match length {
            0..=127 => self.write_bits(length as u64, 8),
            128..=16383 => self.write_bits(0x8000 | length as u64, 16),
            _ => return Err(PerError::FragmentedLength),
        }
        Ok(())
    }

    pub fn encode_constrained_length(&mut self, length: usize, min: usize, max: usize) -> PerResult<()> {
        let constraint = Constraint::new(min as i64, max as i64);
        self.encode_constrained_whole_number(length as i64, &constraint)
    }

    pub fn encode_enumerated(&mut self, value: i64, constraint: &Constraint) -> PerResult<()> {
        if !constraint.extensible {
            return self.encode_constrained_whole_number(value, constraint);
        }
        let in_root = value >= constraint.min && value <= constraint.max;
        self.write_bit(!in_root);
        if in_root {
            self.encode_constrained_whole_number(value, constraint)
        } else {
            self.encode_normally_small_non_negative((value - constraint.max - 1) as u64)
        }
    }

    pub fn encode_normally_small_non_negative(&mut self, value: u64) -> PerResult<()> {
        if value < 64 {
            self.write_bit(false);
            self.write_bits(value, 6);
            Ok(())
        } else {
            self.write_bit(true);
            self.encode_unconstrained_whole_number(value as i64)
        }
    }

    pub fn encode_choice_index(
        &mut self,
        index: usize,
        root_alternatives: usize,
        extensible: bool,
    ) -> PerResult<()> {
        let in_root = index < root_alternatives;
        if extensible {
            self.write_bit(!in_root);
            if !in_root {
                return self.encode_normally_small_non_negative((index - root_alternatives) as u64);
            }
        } else if !in_root {
            return Err(PerError::InvalidChoiceIndex {
                index,
                max: root_alternatives.saturating_sub(1),
            });
        }
        let constraint = Constraint::new(0, root_alternatives as i64 - 1);
        self.encode_constrained_whole_number(index as i64, &constraint)
    }

    pub fn encode_octet_string(
        &mut self,
        data: &[u8],
        min_len: Option<usize>,
        max_len: Option<usize>,
    ) -> PerResult<()> {
        match (min_len, max_len) {
            (Some(min), Some(max)) if min == max => {
                if data.len() != min {
                    return Err(PerError::InvalidLength { length: data.len() });
                }
                if min > 2 {
                    self.align();
                }
            }
            (Some(min), Some(max)) => {
                self.encode_constrained_length(data.len(), min, max)?;
                if max > 2 {
                    self.align();
                }
            }
            _ => self.encode_length_determinant(data.len())?,
        }
        self.write_bytes(data);
        Ok(())
    }

    pub fn encode_bit_string(
        &mut self,
        bits: &BitSlice<u8, Msb0>,
        min_len: Option<usize>,
        max_len: Option<usize>,
    ) -> PerResult<()> {
        match (min_len, max_len) {
            (Some(min), Some(max)) if min == max => {
                if bits.len() != min {
                    return Err(PerError::InvalidLength { length: bits.len() });
                }
                if min > 16 {
                    self.align();
                }
            }
            (Some(min), Some(max)) => {
                self.encode_constrained_length(bits.len(), min, max)?;
                if max > 16 {
                    self.align();
                }
            }
            _ => self.encode_length_determinant(bits.len())?,
        }
        self.bits.extend_from_bitslice(bits);
        Ok(())
    }

    /// Encodes `value` as an open type: its own aligned encoding wrapped in
    /// an octet-length determinant
    pub fn encode_open_type<T: AperEncode + ?Sized>(&mut self, value: &T) -> PerResult<()> {
        let mut inner = AperEncoder::new();
        value.encode_aper(&mut inner)?;
        let octets = inner.into_bytes();
        self.encode_length_determinant(octets.len())?;
        self.write_bytes(&octets);
        Ok(())
    }
}

/// APER decoder reading MSB-first from a borrowed byte slice
pub struct AperDecoder<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    position: usize,
}

impl<'a> AperDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            bits: data.view_bits::<Msb0>(),
            position: 0,
        }
    }

    pub fn bit_position(&self) -> usize {
        self.position
    }

    pub fn remaining_bits(&self) -> usize {
        self.bits.len().saturating_sub(self.position)
    }

    pub fn align(&mut self) {
        let rem = self.position % 8;
        if rem != 0 {
            self.position += 8 - rem;
        }
    }

    pub fn read_bit(&mut self) -> PerResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_bits(&mut self, width: usize) -> PerResult<u64> {
        let available = self.remaining_bits();
        if width > available {
            return Err(PerError::BufferUnderflow { needed: width, available });
        }
        let field = &self.bits[self.position..self.position + width];
        self.position += width;
        Ok(field.iter().fold(0u64, |acc, bit| (acc << 1) | (*bit as u64)))
    }

    pub fn read_bytes(&mut self, count: usize) -> PerResult<Vec<u8>> {
        let needed = count * 8;
        let available = self.remaining_bits();
        if needed > available {
            return Err(PerError::BufferUnderflow { needed, available });
        }
        (0..count).map(|_| self.read_bits(8).map(|b| b as u8)).collect()
    }

    pub fn decode_constrained_whole_number(&mut self, constraint: &Constraint) -> PerResult<i64> {
        let offset = match width_of(constraint) {
            Width::Empty => 0,
            Width::BitField(n) => self.read_bits(n)?,
            Width::AlignedOctets(n) => {
                self.align();
                self.read_bits(n * 8)?
            }
            Width::Unconstrained => {
                let value = self.decode_unconstrained_whole_number()?;
                constraint.check(value)?;
                return Ok(value);
            }
        };
        let value = constraint.min + offset as i64;
        constraint.check(value)?;
        Ok(value)
    }

    pub fn decode_unconstrained_whole_number(&mut self) -> PerResult<i64> {
        let len = self.decode_length_determinant()?;
        if len > 8 {
            return Err(PerError::InvalidLength { length: len });
        }
        let octets = self.read_bytes(len)?;
        let Some(&first) = octets.first() else {
            return Ok(0);
        };
        let seed: i64 = if first & 0x80 != 0 { -1 } else { 0 };
        Ok(octets.iter().fold(seed, |acc, &b| (acc << 8) | b as i64))
    }

    pub fn decode_length_determinant(&mut self) -> PerResult<usize> {
        self.align();
        let first = self.read_bits(8)? as usize;
        if first & 0x80 == 0 {
            return Ok(first);
        }
        if first & 0x40 == 0 {
            let second = self.read_bits(8)? as usize;
            return Ok(((first & 0x3F) << 8) | second);
        }
        // 11 prefix: a fragment header, followed by interleaved content
        Err(PerError::FragmentedLength)
    }

    pub fn decode_constrained_length(&mut self, min: usize, max: usize) -> PerResult<usize> {
        let constraint = Constraint::new(min as i64, max as i64);
        self.decode_constrained_whole_number(&constraint).map(|v| v as usize)
    }

    pub fn decode_enumerated(&mut self, constraint: &Constraint) -> PerResult<i64> {
        if constraint.extensible && self.read_bit()? {
            let ext = self.decode_normally_small_non_negative()?;
            return i64::try_from(ext)
                .ok()
                .and_then(|ext| constraint.max.checked_add(1)?.checked_add(ext))
                .ok_or_else(|| PerError::DecodeError(format!("Enumerated extension {ext} out of range")));
        }
        self.decode_constrained_whole_number(constraint)
    }

    pub fn decode_normally_small_non_negative(&mut self) -> PerResult<u64> {
        if self.read_bit()? {
            let value = self.decode_unconstrained_whole_number()?;
            u64::try_from(value)
                .map_err(|_| PerError::DecodeError(format!("Negative normally small number: {value}")))
        } else {
            self.read_bits(6)
        }
    }

    pub fn decode_choice_index(&mut self, root_alternatives: usize, extensible: bool) -> PerResult<usize> {
        if extensible && self.read_bit()? {
            let ext = self.decode_normally_small_non_negative()?;
            return usize::try_from(ext)
                .ok()
                .and_then(|ext| root_alternatives.checked_add(ext))
                .ok_or(PerError::InvalidChoiceIndex {
                    index: usize::MAX,
                    max: root_alternatives.saturating_sub(1),
                });
        }
        let constraint = Constraint::new(0, root_alternatives as i64 - 1);
        self.decode_constrained_whole_number(&constraint).map(|v| v as usize)
    }

    pub fn decode_octet_string(
        &mut self,
        min_len: Option<usize>,
        max_len: Option<usize>,
    ) -> PerResult<Vec<u8>> {
        let len = match (min_len, max_len) {
            (Some(min), Some(max)) if min == max => {
                if min > 2 {
                    self.align();
                }
                min
            }
            (Some(min), Some(max)) => {
                let len = self.decode_constrained_length(min, max)?;
                if max > 2 {
                    self.align();
                }
                len
            }
            _ => self.decode_length_determinant()?,
        };
        self.read_bytes(len)
    }

    pub fn decode_bit_string(
        &mut self,
        min_len: Option<usize>,
        max_len: Option<usize>,
    ) -> PerResult<BitVec<u8, Msb0>> {
        let len = match (min_len, max_len) {
            (Some(min), Some(max)) if min == max => {
                if min > 16 {
                    self.align();
                }
                min
            }
            (Some(min), Some(max)) => {
                let len = self.decode_constrained_length(min, max)?;
                if max > 16 {
                    self.align();
                }
                len
            }
            _ => self.decode_length_determinant()?,
        };
        let available = self.remaining_bits();
        if len > available {
            return Err(PerError::BufferUnderflow { needed: len, available });
        }
        let out = self.bits[self.position..self.position + len].to_bitvec();
        self.position += len;
        Ok(out)
    }

    /// Reads the octets of an open type without interpreting them
    pub fn decode_open_type_bytes(&mut self) -> PerResult<Vec<u8>> {
        let len = self.decode_length_determinant()?;
        self.read_bytes(len)
    }

    /// Decodes an open type whose contents must decode as `T`
    pub fn decode_open_type<T: AperDecode>(&mut self) -> PerResult<T> {
        let octets = self.decode_open_type_bytes()?;
        let mut inner = AperDecoder::new(&octets);
        T::decode_aper(&mut inner)
    }
}

/// Types with an APER encoding
pub trait AperEncode {
    fn encode_aper(&self, encoder: &mut AperEncoder) -> PerResult<()>;
}

/// Types decodable from APER
pub trait AperDecode: Sized {
    fn decode_aper(decoder: &mut AperDecoder) -> PerResult<Self>;
}
