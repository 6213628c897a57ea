//! Little-endian binary codec: fixed-width integers, byte runs, and a
//! CompactSize variable-length count identical to Bitcoin's.
//!
//! Prefix byte `0x00..=0xFC` is a literal count; `0xFD` + `u16 LE`, `0xFE` +
//! `u32 LE`, `0xFF` + `u64 LE` extend it. A shorter prefix must always be
//! used when the value fits, matching the VarInt minimality check in
//! `summa-tx-coins/core/src/ser.rs`.

use crate::error::DecodeError;

/// A cursor over a borrowed byte slice.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len == 0 {
            return Ok(&self.buf[self.pos..self.pos]);
        }
        if self.pos >= self.buf.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        if self.pos + len > self.buf.len() {
            return Err(DecodeError::TruncatedInput);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_array32(&mut self) -> Result<[u8; 32], DecodeError> {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(self.read_bytes(32)?);
        Ok(arr)
    }

    /// Reads a Bitcoin-style CompactSize count, rejecting non-minimal encodings.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let prefix = self.read_u8()?;
        let value = match prefix {
            0x00..=0xFC => prefix as u64,
            0xFD => u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()) as u64,
            0xFE => u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()) as u64,
            0xFF => u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()),
        };
        if varint_prefix_for(value) != prefix {
            return Err(DecodeError::BadVarInt);
        }
        Ok(value)
    }
}

fn varint_prefix_for(value: u64) -> u8 {
    match value {
        0x00..=0xFC => value as u8,
        0xFD..=0xFFFF => 0xFD,
        0x1_0000..=0xFFFF_FFFF => 0xFE,
        _ => 0xFF,
    }
}

pub fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_i32_le(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
}

/// Writes a Bitcoin-style CompactSize count using the shortest valid prefix.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    match value {
        0x00..=0xFC => out.push(value as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// A type with a canonical binary wire representation.
pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// A type decodable from a [`ByteReader`]. Decode errors are reported as the
/// crate-wide [`crate::error::Error`] since some decoders (transactions)
/// also surface crypto-encoding failures.
pub trait Decode: Sized {
    fn decode(r: &mut ByteReader<'_>) -> crate::error::Result<Self>;
}

pub fn decode_from_slice<T: Decode>(bytes: &[u8]) -> crate::error::Result<T> {
    let mut r = ByteReader::new(bytes);
    T::decode(&mut r)
}
