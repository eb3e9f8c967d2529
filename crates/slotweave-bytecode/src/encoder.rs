//! Binary encoding and decoding utilities
//!
//! Low-level little-endian writer and reader used by the module codec.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors that can occur during decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpected end of the input stream
    #[error("Unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// Invalid opcode
    #[error("Invalid opcode {0:#04x} at offset {1}")]
    InvalidOpcode(u8, usize),

    /// Unknown discriminant for a tagged value
    #[error("Invalid {kind} tag {tag} at offset {offset}")]
    InvalidTag {
        /// What was being decoded
        kind: &'static str,
        /// The tag byte that was read
        tag: u8,
        /// Offset of the tag byte
        offset: usize,
    },
}

/// Writer for the binary module format
pub struct BytecodeWriter {
    /// Internal buffer containing the encoded bytes
    pub(crate) buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of the buffer)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    // ===== Basic Emission =====

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (little-endian)
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit signed integer (little-endian)
    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a boolean as a single byte
    pub fn emit_bool(&mut self, value: bool) {
        self.emit_u8(value as u8);
    }

    /// Emit a length-prefixed string (u32 length + UTF-8 bytes)
    pub fn emit_string(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Emit an opcode byte
    pub fn emit_opcode(&mut self, opcode: Opcode) {
        self.emit_u8(opcode.to_u8());
    }

    /// Patch a previously emitted u32 value at the given offset
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        let bytes = value.to_le_bytes();
        self.buffer[offset..offset + 4].copy_from_slice(&bytes);
    }
}

impl Default for BytecodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader for the binary module format
pub struct BytecodeReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Preallocation size for `count` encoded elements.
    ///
    /// Every element takes at least one byte, so a count larger than the
    /// bytes left can never decode.
    pub fn capacity_for(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Seek to a specific position
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    // ===== Basic Reading =====

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 32-bit signed integer (little-endian)
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a boolean byte
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a length-prefixed string (u32 length + UTF-8 bytes)
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32()? as usize;
        let start = self.position;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(start))
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(count)?.to_vec())
    }

    /// Read an opcode
    pub fn read_opcode(&mut self) -> Result<Opcode, DecodeError> {
        let byte = self.read_u8()?;
        Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte, self.position - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_emission() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u8(0x42);
        writer.emit_u16(0x1234);
        writer.emit_u32(0xABCD_EF01);

        let bytes = writer.buffer();
        assert_eq!(bytes[0], 0x42);
        assert_eq!(bytes[1], 0x34); // Little-endian
        assert_eq!(bytes[2], 0x12);
        assert_eq!(bytes[3], 0x01); // Little-endian
        assert_eq!(bytes[4], 0xEF);
        assert_eq!(bytes[5], 0xCD);
        assert_eq!(bytes[6], 0xAB);
    }

    #[test]
    fn test_patch_u32() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u32(0);
        writer.emit_u8(7);
        writer.patch_u32(0, 0xDEAD_BEEF);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u8().unwrap(), 7);
    }

    #[test]
    fn test_reader_bounds_checking() {
        let bytes = vec![0x01, 0x02];
        let mut reader = BytecodeReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u8().unwrap(), 0x02);
        assert!(matches!(reader.read_u8(), Err(DecodeError::UnexpectedEnd(2))));
    }

    #[test]
    fn test_capacity_bounded_by_remaining() {
        let bytes = [0u8; 6];
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(reader.capacity_for(usize::MAX), 6);

        reader.read_u32().unwrap();
        assert_eq!(reader.capacity_for(1), 1);
        assert_eq!(reader.capacity_for(u32::MAX as usize), 2);
    }

    #[test]
    fn test_reader_string() {
        let mut writer = BytecodeWriter::new();
        writer.emit_string("hello");
        writer.emit_string("");

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert_eq!(reader.read_string().unwrap(), "");
        assert!(!reader.has_more());
    }

    #[test]
    fn test_reader_truncated_string() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u32(10);
        writer.emit_u8(b'x');

        let mut reader = BytecodeReader::new(writer.buffer());
        assert!(matches!(reader.read_string(), Err(DecodeError::UnexpectedEnd(4))));
    }

    #[test]
    fn test_reader_invalid_utf8() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u32(2);
        writer.emit_u8(0xC3);
        writer.emit_u8(0x28);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert!(matches!(reader.read_string(), Err(DecodeError::InvalidUtf8(4))));
    }

    #[test]
    fn test_reader_position_tracking() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u8(0x01);
        writer.emit_u16(0x0203);
        writer.emit_i32(-4);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.position(), 0);
        reader.read_u8().unwrap();
        assert_eq!(reader.position(), 1);
        reader.read_u16().unwrap();
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read_i32().unwrap(), -4);
        assert_eq!(reader.remaining(), 0);

        reader.seek(1);
        assert_eq!(reader.read_u16().unwrap(), 0x0203);
    }

    #[test]
    fn test_reader_opcode() {
        let mut writer = BytecodeWriter::new();
        writer.emit_opcode(Opcode::LdArg);
        writer.emit_opcode(Opcode::Ret);
        writer.emit_u8(0xFF);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.read_opcode().unwrap(), Opcode::LdArg);
        assert_eq!(reader.read_opcode().unwrap(), Opcode::Ret);
        assert!(matches!(
            reader.read_opcode(),
            Err(DecodeError::InvalidOpcode(0xFF, 2))
        ));
    }
}
