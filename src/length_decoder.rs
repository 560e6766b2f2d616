//! Instruction length decoder for the x86/x86-64 subset that compiler-emitted
//! prologues use.
//!
//! The decoder never interprets instruction semantics; it only accounts for
//! prefixes, the opcode, ModR/M + SIB + displacement, and the immediate, so
//! the hook engine can find instruction boundaries. Two known approximations
//! are carried on purpose: the `0x0F` escape byte re-indexes the primary
//! opcode table with the second byte (so most two-byte forms, e.g. the
//! `0F 1F` multi-byte NOP, fail to decode), and the `0xA0-0xA3` moffs forms
//! count a 4-byte offset on every width.

use bit_field::BitField;

use crate::opcodes::{OPCODES, OpcodeKind};
use crate::{HookError, Result};

/// Maximum encodable instruction length on x86 (15 bytes).
pub const MAX_INSTRUCTION_LENGTH: usize = 15;

/// REX prefix fields (64-bit mode only).
#[derive(Debug, Clone, Copy, Default)]
pub struct RexPrefix {
    /// Extension of the ModR/M reg field.
    pub r: bool,
    /// Extension of the SIB index field.
    pub x: bool,
    /// Extension of the ModR/M r/m, SIB base, or opcode reg field.
    pub b: bool,
    /// 64-bit operand size.
    pub w: bool,
}

impl RexPrefix {
    /// Parses a REX prefix from a byte in `0x40-0x4F`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte & 0xF0 == 0x40 {
            Some(Self {
                w: byte.get_bit(3),
                r: byte.get_bit(2),
                x: byte.get_bit(1),
                b: byte.get_bit(0),
            })
        } else {
            None
        }
    }
}

/// ModR/M byte fields.
#[derive(Debug, Clone, Copy)]
pub struct ModRm {
    /// Mode field (2 bits).
    pub mode: u8,
    /// Register/opcode field (3 bits).
    pub reg: u8,
    /// R/M field (3 bits).
    pub rm: u8,
}

impl ModRm {
    /// Parses ModR/M fields from a byte.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            mode: byte.get_bits(6..8),
            reg: byte.get_bits(3..6),
            rm: byte.get_bits(0..3),
        }
    }

    /// Whether a SIB byte follows.
    pub fn needs_sib(&self) -> bool {
        self.mode != 3 && self.rm == 4
    }

    /// Displacement length in bytes. `mode == 0, rm == 5` is RIP-relative on
    /// 64-bit and absolute on 32-bit; the displacement is 4 bytes either way.
    pub fn displacement_length(&self) -> usize {
        match self.mode {
            0 => {
                if self.rm == 5 {
                    4
                } else {
                    0
                }
            }
            1 => 1,
            2 => 4,
            _ => 0,
        }
    }
}

fn is_legacy_prefix(byte: u8) -> bool {
    // Operand size, address size, LOCK, REPNE, REP. Segment overrides are
    // outside the covered subset and hit their Invalid table entries instead.
    matches!(byte, 0x66 | 0x67 | 0xF0 | 0xF2 | 0xF3)
}

fn rex_prefix(byte: u8) -> Option<RexPrefix> {
    if cfg!(target_pointer_width = "64") {
        RexPrefix::from_byte(byte)
    } else {
        None
    }
}

struct Prefixes {
    /// Last REX byte observed, as on hardware.
    rex: Option<RexPrefix>,
    len: usize,
}

fn parse_prefixes(bytes: &[u8]) -> Prefixes {
    let mut rex = None;
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        if is_legacy_prefix(byte) {
            rex = None;
            pos += 1;
        } else if let Some(r) = rex_prefix(byte) {
            rex = Some(r);
            pos += 1;
        } else {
            break;
        }
    }

    Prefixes { rex, len: pos }
}

/// Computes the byte length of the instruction at the start of `bytes`.
///
/// `bytes` is a read window into executable code; [`MAX_INSTRUCTION_LENGTH`]
/// bytes are always enough. Returns [`HookError::UndecodableOpcode`] for
/// opcodes outside the covered subset, or when the window ends while prefix,
/// opcode, ModR/M, or SIB bytes are still expected.
pub fn instruction_length(bytes: &[u8]) -> Result<usize> {
    let prefixes = parse_prefixes(bytes);
    let mut pos = prefixes.len;

    let opcode = *bytes.get(pos).ok_or(HookError::UndecodableOpcode)?;
    pos += 1;

    let mut info = &OPCODES[opcode as usize];
    let mut two_byte = false;
    if info.kind == OpcodeKind::TwoByte {
        let second = *bytes.get(pos).ok_or(HookError::UndecodableOpcode)?;
        pos += 1;
        info = &OPCODES[second as usize];
        two_byte = true;
    }
    if info.kind == OpcodeKind::Invalid {
        return Err(HookError::UndecodableOpcode);
    }

    if info.has_modrm {
        let modrm = ModRm::from_byte(*bytes.get(pos).ok_or(HookError::UndecodableOpcode)?);
        pos += 1;
        if modrm.needs_sib() {
            bytes.get(pos).ok_or(HookError::UndecodableOpcode)?;
            pos += 1;
        }
        pos += modrm.displacement_length();
    }

    // MOV r64, imm64: the B8+r one-byte forms carry an 8-byte immediate when
    // REX.W is set.
    let rex_w = prefixes.rex.is_some_and(|rex| rex.w);
    if !two_byte && (0xB8..=0xBF).contains(&opcode) && rex_w {
        pos += 8;
    } else {
        pos += info.imm.bytes();
    }

    if pos > MAX_INSTRUCTION_LENGTH {
        return Err(HookError::UndecodableOpcode);
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(bytes: &[u8]) -> usize {
        instruction_length(bytes).unwrap()
    }

    #[test]
    fn test_register_mov() {
        // MOV EAX, EBX (89 D8)
        assert_eq!(len(&[0x89, 0xD8]), 2);
    }

    #[test]
    fn test_mov_with_immediate() {
        // MOV EAX, 0x12345678 (B8 78 56 34 12)
        assert_eq!(len(&[0xB8, 0x78, 0x56, 0x34, 0x12]), 5);
    }

    #[test]
    fn test_memory_operand() {
        // MOV EAX, [RBX] (8B 03)
        assert_eq!(len(&[0x8B, 0x03]), 2);
    }

    #[test]
    fn test_memory_with_displacement() {
        // MOV EAX, [RBX+0x12345678] (8B 83 78 56 34 12)
        assert_eq!(len(&[0x8B, 0x83, 0x78, 0x56, 0x34, 0x12]), 6);
        // MOV EAX, [RBP-8] (8B 45 F8)
        assert_eq!(len(&[0x8B, 0x45, 0xF8]), 3);
    }

    #[test]
    fn test_sib_byte() {
        // MOV EAX, [RAX+RCX*8] (8B 04 C8)
        assert_eq!(len(&[0x8B, 0x04, 0xC8]), 3);
    }

    #[test]
    fn test_rip_relative() {
        // MOV EAX, [RIP+0x1234] (8B 05 34 12 00 00)
        assert_eq!(len(&[0x8B, 0x05, 0x34, 0x12, 0x00, 0x00]), 6);
    }

    #[test]
    fn test_prefix_combinations() {
        // LOCK REP MOV EAX, EBX (F0 F3 89 D8)
        assert_eq!(len(&[0xF0, 0xF3, 0x89, 0xD8]), 4);
    }

    #[test]
    fn test_enter() {
        // ENTER 0x20, 0 (C8 20 00 00)
        assert_eq!(len(&[0xC8, 0x20, 0x00, 0x00]), 4);
    }

    #[test]
    fn test_call_and_jmp() {
        // CALL rel32 (E8 ..), JMP rel8 (EB ..)
        assert_eq!(len(&[0xE8, 0x01, 0x02, 0x03, 0x04]), 5);
        assert_eq!(len(&[0xEB, 0x05]), 2);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_rex_prefix() {
        // REX.W MOV RAX, RBX (48 89 D8)
        assert_eq!(len(&[0x48, 0x89, 0xD8]), 3);
        // SUB RSP, 0x20 (48 83 EC 20)
        assert_eq!(len(&[0x48, 0x83, 0xEC, 0x20]), 4);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_rex_w_widens_mov_imm() {
        // MOV RAX, imm64 (48 B8 + 8 bytes)
        let bytes = [0x48, 0xB8, 0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(len(&bytes), 10);
        // Without W the immediate stays 4 bytes (41 B8 = MOV R8D, imm32).
        assert_eq!(len(&[0x41, 0xB8, 0, 1, 2, 3]), 6);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_legacy_prefix_resets_rex() {
        // A REX byte only counts when it immediately precedes the opcode;
        // 48 66 B8 leaves the immediate at 4 bytes.
        assert_eq!(len(&[0x48, 0x66, 0xB8, 0, 1, 2, 3]), 7);
    }

    #[test]
    fn test_undefined_opcode_fails() {
        // PUSH ES (06) is not covered.
        assert_eq!(
            instruction_length(&[0x06, 0x90]),
            Err(HookError::UndecodableOpcode)
        );
    }

    #[test]
    fn test_segment_override_fails() {
        // FS-relative accesses are outside the covered subset.
        assert_eq!(
            instruction_length(&[0x64, 0x8B, 0x03]),
            Err(HookError::UndecodableOpcode)
        );
    }

    #[test]
    fn test_two_byte_escape() {
        // MOVZX EAX, AL (0F B6 C0) sizes correctly through the shared table.
        assert_eq!(len(&[0x0F, 0xB6, 0xC0]), 3);
        // The 0F 1F multi-byte NOP is not covered.
        assert_eq!(
            instruction_length(&[0x0F, 0x1F, 0x40, 0x00]),
            Err(HookError::UndecodableOpcode)
        );
    }

    #[test]
    fn test_truncated_window_fails() {
        assert_eq!(instruction_length(&[]), Err(HookError::UndecodableOpcode));
        // Opcode wants a ModR/M byte that is not there.
        assert_eq!(
            instruction_length(&[0x89]),
            Err(HookError::UndecodableOpcode)
        );
        // All prefixes, never an opcode.
        assert_eq!(
            instruction_length(&[0x66; MAX_INSTRUCTION_LENGTH]),
            Err(HookError::UndecodableOpcode)
        );
    }
}
