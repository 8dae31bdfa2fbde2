//! Opcode definitions for the VM.

/// All VM opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Constants
    /// 0x00: push an empty value.
    Op0,
    /// 0x01-0x4b: push the next N bytes.
    PushBytes(u8),
    /// 0x4c: next byte is the length of the push.
    PushData1,
    /// 0x4d: next 2 bytes (LE) are the length of the push.
    PushData2,
    /// 0x4e: next 4 bytes (LE) are the length of the push.
    PushData4,
    /// 0x4f: push -1.
    Op1Negate,
    /// 0x51-0x60: push 1..=16.
    PushNum(u8),

    // Flow control
    Verify,

    // Stack
    Dup,

    // Bitwise logic
    EqualVerify,

    // Arithmetic
    Add,
    NumEqual,

    // Crypto
    Hash160,
    CheckSig,
}

impl Opcode {
    /// Parse a byte as an opcode.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::Op0),
            0x01..=0x4b => Some(Opcode::PushBytes(byte)),
            0x4c => Some(Opcode::PushData1),
            0x4d => Some(Opcode::PushData2),
            0x4e => Some(Opcode::PushData4),
            0x4f => Some(Opcode::Op1Negate),
            0x51..=0x60 => Some(Opcode::PushNum(byte - 0x50)),
            0x69 => Some(Opcode::Verify),
            0x76 => Some(Opcode::Dup),
            0x88 => Some(Opcode::EqualVerify),
            0x93 => Some(Opcode::Add),
            0x9c => Some(Opcode::NumEqual),
            0xa9 => Some(Opcode::Hash160),
            0xac => Some(Opcode::CheckSig),
            _ => None,
        }
    }

    /// The encoded byte of this opcode.
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Op0 => 0x00,
            Opcode::PushBytes(n) => n,
            Opcode::PushData1 => 0x4c,
            Opcode::PushData2 => 0x4d,
            Opcode::PushData4 => 0x4e,
            Opcode::Op1Negate => 0x4f,
            Opcode::PushNum(n) => 0x50 + n,
            Opcode::Verify => 0x69,
            Opcode::Dup => 0x76,
            Opcode::EqualVerify => 0x88,
            Opcode::Add => 0x93,
            Opcode::NumEqual => 0x9c,
            Opcode::Hash160 => 0xa9,
            Opcode::CheckSig => 0xac,
        }
    }

    /// Script-language mnemonic.
    pub fn mnemonic(self) -> String {
        match self {
            Opcode::Op0 => "OP_0".into(),
            Opcode::PushBytes(n) => format!("PUSH{}", n),
            Opcode::PushData1 => "OP_PUSHDATA1".into(),
            Opcode::PushData2 => "OP_PUSHDATA2".into(),
            Opcode::PushData4 => "OP_PUSHDATA4".into(),
            Opcode::Op1Negate => "OP_1NEGATE".into(),
            Opcode::PushNum(n) => format!("OP_{}", n),
            Opcode::Verify => "OP_VERIFY".into(),
            Opcode::Dup => "OP_DUP".into(),
            Opcode::EqualVerify => "OP_EQUALVERIFY".into(),
            Opcode::Add => "OP_ADD".into(),
            Opcode::NumEqual => "OP_NUMEQUAL".into(),
            Opcode::Hash160 => "OP_HASH160".into(),
            Opcode::CheckSig => "OP_CHECKSIG".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_bytes() {
        assert_eq!(Opcode::from_byte(0x00), Some(Opcode::Op0));
        assert_eq!(Opcode::from_byte(0x01), Some(Opcode::PushBytes(1)));
        assert_eq!(Opcode::from_byte(0x4b), Some(Opcode::PushBytes(75)));
        assert_eq!(Opcode::from_byte(0x51), Some(Opcode::PushNum(1)));
        assert_eq!(Opcode::from_byte(0x60), Some(Opcode::PushNum(16)));
        assert_eq!(Opcode::from_byte(0xac), Some(Opcode::CheckSig));
    }

    #[test]
    fn test_unassigned_bytes() {
        for byte in [0x50, 0x61, 0x6a, 0x87, 0xff] {
            assert_eq!(Opcode::from_byte(byte), None, "byte {:#x}", byte);
        }
    }

    #[test]
    fn test_byte_roundtrip() {
        for byte in 0u8..=255 {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.to_byte(), byte);
            }
        }
    }

    #[test]
    fn test_mnemonic() {
        assert_eq!(Opcode::PushNum(7).mnemonic(), "OP_7");
        assert_eq!(Opcode::Hash160.mnemonic(), "OP_HASH160");
    }
}
