//! Property tests for the opcode table as seen through the length decoder.

use crate::{HookError, MAX_INSTRUCTION_LENGTH, OPCODES, OpcodeKind, instruction_length};

#[test]
fn synthetic_single_instruction_lengths() {
    for (byte, info) in OPCODES.iter().enumerate() {
        if matches!(info.kind, OpcodeKind::Invalid | OpcodeKind::TwoByte) {
            continue;
        }
        // On 64-bit builds the prefix loop claims 40-4F before the table is
        // consulted.
        if cfg!(target_pointer_width = "64") && (0x40..=0x4F).contains(&byte) {
            continue;
        }

        let mut buf = [0u8; MAX_INSTRUCTION_LENGTH];
        buf[0] = byte as u8;
        if info.has_modrm {
            // mod=3, rm=0: no SIB, no displacement.
            buf[1] = 0xC0;
        }
        let expected = 1 + info.has_modrm as usize + info.imm.bytes();
        assert_eq!(
            instruction_length(&buf).unwrap(),
            expected,
            "opcode {byte:#04x}"
        );
    }
}

#[test]
fn length_is_bounded() {
    for byte in 0..=255u8 {
        let buf = [byte; MAX_INSTRUCTION_LENGTH];
        match instruction_length(&buf) {
            Ok(len) => assert!(
                (1..=MAX_INSTRUCTION_LENGTH).contains(&len),
                "opcode {byte:#04x} reported {len}"
            ),
            Err(err) => assert_eq!(err, HookError::UndecodableOpcode),
        }
    }
}

#[test]
fn prefixes_extend_length_by_one() {
    // MOV EAX, EBX
    let base = [0x89, 0xD8];
    let base_len = instruction_length(&base).unwrap();

    let mut buf = [0u8; MAX_INSTRUCTION_LENGTH];
    for prefix in [0x66, 0x67, 0xF0, 0xF2, 0xF3] {
        buf[0] = prefix;
        buf[1..1 + base.len()].copy_from_slice(&base);
        assert_eq!(
            instruction_length(&buf).unwrap(),
            base_len + 1,
            "prefix {prefix:#04x}"
        );
    }

    // Any REX byte in front of a non-B8..BF opcode is one prefix byte; the
    // W bit changes nothing for register-to-register MOV.
    #[cfg(target_pointer_width = "64")]
    for rex in 0x40..=0x4Fu8 {
        buf[0] = rex;
        buf[1..1 + base.len()].copy_from_slice(&base);
        assert_eq!(
            instruction_length(&buf).unwrap(),
            base_len + 1,
            "rex {rex:#04x}"
        );
    }
}

#[test]
fn prefix_bytes_are_invalid_table_entries() {
    // The prefix loop, not the table, keeps these alive.
    for byte in [0x66u8, 0x67, 0xF0, 0xF2, 0xF3] {
        assert_eq!(OPCODES[byte as usize].kind, OpcodeKind::Invalid);
    }
    assert_eq!(OPCODES[0x0F].kind, OpcodeKind::TwoByte);
}
