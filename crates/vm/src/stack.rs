//! The VM value stack and its numeric encoding.

use crate::executor::VmError;

/// Maximum width of a numeric operand.
pub const MAX_NUM_BYTES: usize = 8;

/// A stack of byte arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Vec<u8>) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, VmError> {
        self.items.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop two values, returning `(second, top)`.
    pub fn pop_pair(&mut self) -> Result<(Vec<u8>, Vec<u8>), VmError> {
        if self.items.len() < 2 {
            return Err(VmError::StackUnderflow);
        }
        let top = self.pop()?;
        let second = self.pop()?;
        Ok((second, top))
    }

    pub fn top(&self) -> Option<&[u8]> {
        self.items.last().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn push_num(&mut self, value: i64) {
        self.push(encode_num(value));
    }

    pub fn push_bool(&mut self, value: bool) {
        self.push(vec![value as u8]);
    }
}

/// Fixed-width 8-byte little-endian two's complement.
pub fn encode_num(value: i64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Decode a little-endian signed integer of up to 8 bytes, sign-extending
/// from the most significant byte. An empty value is zero.
pub fn decode_num(bytes: &[u8]) -> Result<i64, VmError> {
    if bytes.len() > MAX_NUM_BYTES {
        return Err(VmError::NumberTooLong(bytes.len()));
    }
    let fill = match bytes.last() {
        Some(b) if b & 0x80 != 0 => 0xff,
        _ => 0x00,
    };
    let mut buf = [fill; MAX_NUM_BYTES];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(i64::from_le_bytes(buf))
}

/// A value is false when every byte is zero (including the empty value).
pub fn is_truthy(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| *b != 0)
}
