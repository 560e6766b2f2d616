//! Classification table for single-byte primary opcodes.
//!
//! One entry per opcode byte: instruction category, ModR/M presence, and
//! immediate size. Only [`OpcodeKind::Invalid`] and [`OpcodeKind::TwoByte`]
//! change how the length decoder proceeds; everything else is decoded from
//! `has_modrm` and `imm`. The `0xA0-0xA3` moffs forms are sized as imm32
//! rather than address-width.

/// Instruction category of a primary opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeKind {
    /// Undefined in long mode, or a prefix byte that the decoder's prefix
    /// loop consumes before the table is consulted.
    Invalid,
    /// Miscellaneous one-off instructions (I/O, string ops).
    Simple,
    /// Control transfer (jumps, calls, returns).
    Control,
    /// ALU and x87 operations.
    Arithmetic,
    /// Data movement (MOV, XCHG, string moves).
    DataMov,
    /// PUSH/POP and flag stack operations.
    Stack,
    /// The `0x0F` escape byte; the next byte selects the opcode.
    TwoByte,
    /// Privileged and interrupt-related instructions.
    System,
}

/// Immediate operand size attached to an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmSize {
    /// No immediate bytes.
    None,
    /// One byte.
    I8,
    /// Two bytes (`RET imm16` and friends).
    I16,
    /// Four bytes.
    I32,
    /// Eight bytes. No table entry carries this; the decoder selects it for
    /// `B8+r` under REX.W.
    I64,
    /// Three bytes, the `ENTER imm16, imm8` form.
    I16I8,
}

impl ImmSize {
    /// Immediate length in bytes. [`ImmSize::I64`] counts four bytes on
    /// 32-bit builds, where no 8-byte immediate exists.
    pub fn bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 => 4,
            Self::I64 => {
                if cfg!(target_pointer_width = "64") {
                    8
                } else {
                    4
                }
            }
            Self::I16I8 => 3,
        }
    }
}

/// Decoding-relevant facts about one primary opcode byte.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub kind: OpcodeKind,
    pub has_modrm: bool,
    pub imm: ImmSize,
}

const fn simple(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: false, imm: ImmSize::None }
}

const fn with_modrm(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: true, imm: ImmSize::None }
}

const fn with_imm8(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: false, imm: ImmSize::I8 }
}

const fn with_imm16(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: false, imm: ImmSize::I16 }
}

const fn with_imm32(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: false, imm: ImmSize::I32 }
}

const fn with_modrm_imm8(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: true, imm: ImmSize::I8 }
}

const fn with_modrm_imm32(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: true, imm: ImmSize::I32 }
}

const fn with_imm16_imm8(kind: OpcodeKind) -> OpcodeInfo {
    OpcodeInfo { kind, has_modrm: false, imm: ImmSize::I16I8 }
}

const INVALID: OpcodeInfo =
    OpcodeInfo { kind: OpcodeKind::Invalid, has_modrm: false, imm: ImmSize::None };

use OpcodeKind::{Arithmetic, Control, DataMov, Simple, Stack, System, TwoByte};

/// Classification of all 256 primary opcode bytes.
pub static OPCODES: [OpcodeInfo; 256] = [
    // 0x00-0x0F: arithmetic and the two-byte escape
    with_modrm(Arithmetic), // 00 - ADD r/m8, r8
    with_modrm(Arithmetic), // 01 - ADD r/m32, r32
    with_modrm(Arithmetic), // 02 - ADD r8, r/m8
    with_modrm(Arithmetic), // 03 - ADD r32, r/m32
    with_imm8(Arithmetic),  // 04 - ADD AL, imm8
    with_imm32(Arithmetic), // 05 - ADD EAX, imm32
    INVALID,                // 06
    INVALID,                // 07
    with_modrm(Arithmetic), // 08 - OR r/m8, r8
    with_modrm(Arithmetic), // 09 - OR r/m32, r32
    with_modrm(Arithmetic), // 0A - OR r8, r/m8
    with_modrm(Arithmetic), // 0B - OR r32, r/m32
    with_imm8(Arithmetic),  // 0C - OR AL, imm8
    with_imm32(Arithmetic), // 0D - OR EAX, imm32
    INVALID,                // 0E
    simple(TwoByte),        // 0F - two-byte escape
    // 0x10-0x1F: ADC and SBB
    with_modrm(Arithmetic), // 10 - ADC r/m8, r8
    with_modrm(Arithmetic), // 11 - ADC r/m32, r32
    with_modrm(Arithmetic), // 12 - ADC r8, r/m8
    with_modrm(Arithmetic), // 13 - ADC r32, r/m32
    with_imm8(Arithmetic),  // 14 - ADC AL, imm8
    with_imm32(Arithmetic), // 15 - ADC EAX, imm32
    INVALID,                // 16
    INVALID,                // 17
    with_modrm(Arithmetic), // 18 - SBB r/m8, r8
    with_modrm(Arithmetic), // 19 - SBB r/m32, r32
    with_modrm(Arithmetic), // 1A - SBB r8, r/m8
    with_modrm(Arithmetic), // 1B - SBB r32, r/m32
    with_imm8(Arithmetic),  // 1C - SBB AL, imm8
    with_imm32(Arithmetic), // 1D - SBB EAX, imm32
    INVALID,                // 1E
    INVALID,                // 1F
    // 0x20-0x2F: AND and SUB
    with_modrm(Arithmetic), // 20 - AND r/m8, r8
    with_modrm(Arithmetic), // 21 - AND r/m32, r32
    with_modrm(Arithmetic), // 22 - AND r8, r/m8
    with_modrm(Arithmetic), // 23 - AND r32, r/m32
    with_imm8(Arithmetic),  // 24 - AND AL, imm8
    with_imm32(Arithmetic), // 25 - AND EAX, imm32
    INVALID,                // 26 - ES segment override
    INVALID,                // 27
    with_modrm(Arithmetic), // 28 - SUB r/m8, r8
    with_modrm(Arithmetic), // 29 - SUB r/m32, r32
    with_modrm(Arithmetic), // 2A - SUB r8, r/m8
    with_modrm(Arithmetic), // 2B - SUB r32, r/m32
    with_imm8(Arithmetic),  // 2C - SUB AL, imm8
    with_imm32(Arithmetic), // 2D - SUB EAX, imm32
    INVALID,                // 2E - CS segment override
    INVALID,                // 2F
    // 0x30-0x3F: XOR and CMP
    with_modrm(Arithmetic), // 30 - XOR r/m8, r8
    with_modrm(Arithmetic), // 31 - XOR r/m32, r32
    with_modrm(Arithmetic), // 32 - XOR r8, r/m8
    with_modrm(Arithmetic), // 33 - XOR r32, r/m32
    with_imm8(Arithmetic),  // 34 - XOR AL, imm8
    with_imm32(Arithmetic), // 35 - XOR EAX, imm32
    INVALID,                // 36 - SS segment override
    INVALID,                // 37
    with_modrm(Arithmetic), // 38 - CMP r/m8, r8
    with_modrm(Arithmetic), // 39 - CMP r/m32, r32
    with_modrm(Arithmetic), // 3A - CMP r8, r/m8
    with_modrm(Arithmetic), // 3B - CMP r32, r/m32
    with_imm8(Arithmetic),  // 3C - CMP AL, imm8
    with_imm32(Arithmetic), // 3D - CMP EAX, imm32
    INVALID,                // 3E - DS segment override
    INVALID,                // 3F
    // 0x40-0x4F: INC/DEC in 32-bit mode, REX prefixes in 64-bit mode
    simple(Arithmetic), // 40 - INC eax / REX
    simple(Arithmetic), // 41 - INC ecx / REX.B
    simple(Arithmetic), // 42 - INC edx / REX.X
    simple(Arithmetic), // 43 - INC ebx / REX.XB
    simple(Arithmetic), // 44 - INC esp / REX.R
    simple(Arithmetic), // 45 - INC ebp / REX.RB
    simple(Arithmetic), // 46 - INC esi / REX.RX
    simple(Arithmetic), // 47 - INC edi / REX.RXB
    simple(Arithmetic), // 48 - DEC eax / REX.W
    simple(Arithmetic), // 49 - DEC ecx / REX.WB
    simple(Arithmetic), // 4A - DEC edx / REX.WX
    simple(Arithmetic), // 4B - DEC ebx / REX.WXB
    simple(Arithmetic), // 4C - DEC esp / REX.WR
    simple(Arithmetic), // 4D - DEC ebp / REX.WRB
    simple(Arithmetic), // 4E - DEC esi / REX.WRX
    simple(Arithmetic), // 4F - DEC edi / REX.WRXB
    // 0x50-0x5F: stack operations
    simple(Stack), // 50 - PUSH eax/rax
    simple(Stack), // 51 - PUSH ecx/rcx
    simple(Stack), // 52 - PUSH edx/rdx
    simple(Stack), // 53 - PUSH ebx/rbx
    simple(Stack), // 54 - PUSH esp/rsp
    simple(Stack), // 55 - PUSH ebp/rbp
    simple(Stack), // 56 - PUSH esi/rsi
    simple(Stack), // 57 - PUSH edi/rdi
    simple(Stack), // 58 - POP eax/rax
    simple(Stack), // 59 - POP ecx/rcx
    simple(Stack), // 5A - POP edx/rdx
    simple(Stack), // 5B - POP ebx/rbx
    simple(Stack), // 5C - POP esp/rsp
    simple(Stack), // 5D - POP ebp/rbp
    simple(Stack), // 5E - POP esi/rsi
    simple(Stack), // 5F - POP edi/rdi
    // 0x60-0x6F: mostly invalid in 64-bit mode
    INVALID,                     // 60 - PUSHA/PUSHAD
    INVALID,                     // 61 - POPA/POPAD
    INVALID,                     // 62 - BOUND
    INVALID,                     // 63 - ARPL/MOVSXD
    INVALID,                     // 64 - FS segment override
    INVALID,                     // 65 - GS segment override
    INVALID,                     // 66 - operand size override
    INVALID,                     // 67 - address size override
    with_imm32(Arithmetic),      // 68 - PUSH imm32
    with_modrm_imm32(Arithmetic), // 69 - IMUL r32, r/m32, imm32
    with_imm8(Arithmetic),       // 6A - PUSH imm8
    with_modrm_imm8(Arithmetic), // 6B - IMUL r32, r/m32, imm8
    simple(Simple),              // 6C - INSB
    simple(Simple),              // 6D - INSD
    simple(Simple),              // 6E - OUTSB
    simple(Simple),              // 6F - OUTSD
    // 0x70-0x7F: short conditional jumps
    with_imm8(Control), // 70 - JO rel8
    with_imm8(Control), // 71 - JNO rel8
    with_imm8(Control), // 72 - JB/JNAE/JC rel8
    with_imm8(Control), // 73 - JNB/JAE/JNC rel8
    with_imm8(Control), // 74 - JE/JZ rel8
    with_imm8(Control), // 75 - JNE/JNZ rel8
    with_imm8(Control), // 76 - JBE/JNA rel8
    with_imm8(Control), // 77 - JNBE/JA rel8
    with_imm8(Control), // 78 - JS rel8
    with_imm8(Control), // 79 - JNS rel8
    with_imm8(Control), // 7A - JP/JPE rel8
    with_imm8(Control), // 7B - JNP/JPO rel8
    with_imm8(Control), // 7C - JL/JNGE rel8
    with_imm8(Control), // 7D - JNL/JGE rel8
    with_imm8(Control), // 7E - JLE/JNG rel8
    with_imm8(Control), // 7F - JNLE/JG rel8
    // 0x80-0x8F: immediate-group ALU and MOV
    with_modrm_imm8(Arithmetic),  // 80 - grp1 r/m8, imm8
    with_modrm_imm32(Arithmetic), // 81 - grp1 r/m32, imm32
    with_modrm_imm8(Arithmetic),  // 82 - grp1 r/m8, imm8 (duplicate)
    with_modrm_imm8(Arithmetic),  // 83 - grp1 r/m32, imm8
    with_modrm(Arithmetic),       // 84 - TEST r/m8, r8
    with_modrm(Arithmetic),       // 85 - TEST r/m32, r32
    with_modrm(DataMov),          // 86 - XCHG r8, r/m8
    with_modrm(DataMov),          // 87 - XCHG r32, r/m32
    with_modrm(DataMov),          // 88 - MOV r/m8, r8
    with_modrm(DataMov),          // 89 - MOV r/m32, r32
    with_modrm(DataMov),          // 8A - MOV r8, r/m8
    with_modrm(DataMov),          // 8B - MOV r32, r/m32
    with_modrm(DataMov),          // 8C - MOV r/m16, Sreg
    with_modrm(DataMov),          // 8D - LEA r32, m
    with_modrm(DataMov),          // 8E - MOV Sreg, r/m16
    with_modrm(DataMov),          // 8F - POP r/m32
    // 0x90-0x9F: XCHG, conversions, flag stack ops
    simple(DataMov),     // 90 - NOP / XCHG eax, eax
    simple(DataMov),     // 91 - XCHG eax, ecx
    simple(DataMov),     // 92 - XCHG eax, edx
    simple(DataMov),     // 93 - XCHG eax, ebx
    simple(DataMov),     // 94 - XCHG eax, esp
    simple(DataMov),     // 95 - XCHG eax, ebp
    simple(DataMov),     // 96 - XCHG eax, esi
    simple(DataMov),     // 97 - XCHG eax, edi
    simple(DataMov),     // 98 - CWDE/CBW
    simple(DataMov),     // 99 - CDQ/CWD
    with_imm32(Control), // 9A - CALLF ptr16:32
    simple(System),      // 9B - WAIT/FWAIT
    simple(Stack),       // 9C - PUSHF/PUSHFD
    simple(Stack),       // 9D - POPF/POPFD
    simple(DataMov),     // 9E - SAHF
    simple(DataMov),     // 9F - LAHF
    // 0xA0-0xAF: moffs moves, string operations
    with_imm32(DataMov), // A0 - MOV AL, moffs8
    with_imm32(DataMov), // A1 - MOV EAX, moffs32
    with_imm32(DataMov), // A2 - MOV moffs8, AL
    with_imm32(DataMov), // A3 - MOV moffs32, EAX
    simple(DataMov),     // A4 - MOVSB
    simple(DataMov),     // A5 - MOVSD
    simple(DataMov),     // A6 - CMPSB
    simple(DataMov),     // A7 - CMPSD
    with_imm8(DataMov),  // A8 - TEST AL, imm8
    with_imm32(DataMov), // A9 - TEST EAX, imm32
    simple(DataMov),     // AA - STOSB
    simple(DataMov),     // AB - STOSD
    simple(DataMov),     // AC - LODSB
    simple(DataMov),     // AD - LODSD
    simple(DataMov),     // AE - SCASB
    simple(DataMov),     // AF - SCASD
    // 0xB0-0xBF: immediate MOV; B8-BF widen under REX.W
    with_imm8(DataMov),  // B0 - MOV AL, imm8
    with_imm8(DataMov),  // B1 - MOV CL, imm8
    with_imm8(DataMov),  // B2 - MOV DL, imm8
    with_imm8(DataMov),  // B3 - MOV BL, imm8
    with_imm8(DataMov),  // B4 - MOV AH, imm8
    with_imm8(DataMov),  // B5 - MOV CH, imm8
    with_imm8(DataMov),  // B6 - MOV DH, imm8
    with_imm8(DataMov),  // B7 - MOV BH, imm8
    with_imm32(DataMov), // B8 - MOV EAX, imm32
    with_imm32(DataMov), // B9 - MOV ECX, imm32
    with_imm32(DataMov), // BA - MOV EDX, imm32
    with_imm32(DataMov), // BB - MOV EBX, imm32
    with_imm32(DataMov), // BC - MOV ESP, imm32
    with_imm32(DataMov), // BD - MOV EBP, imm32
    with_imm32(DataMov), // BE - MOV ESI, imm32
    with_imm32(DataMov), // BF - MOV EDI, imm32
    // 0xC0-0xCF: shifts, returns, interrupts
    with_modrm_imm8(Arithmetic), // C0 - grp2 r/m8, imm8
    with_modrm_imm8(Arithmetic), // C1 - grp2 r/m32, imm8
    with_imm16(Control),         // C2 - RET imm16
    simple(Control),             // C3 - RET
    with_modrm(DataMov),         // C4 - LES r32, m16:32
    with_modrm(DataMov),         // C5 - LDS r32, m16:32
    with_modrm_imm8(DataMov),    // C6 - MOV r/m8, imm8
    with_modrm_imm32(DataMov),   // C7 - MOV r/m32, imm32
    with_imm16_imm8(Control),    // C8 - ENTER imm16, imm8
    simple(Control),             // C9 - LEAVE
    with_imm16(Control),         // CA - RETF imm16
    simple(Control),             // CB - RETF
    simple(System),              // CC - INT 3
    with_imm8(System),           // CD - INT imm8
    simple(System),              // CE - INTO
    simple(Control),             // CF - IRET
    // 0xD0-0xDF: shifts by 1/CL, x87 escapes
    with_modrm(Arithmetic), // D0 - grp2 r/m8, 1
    with_modrm(Arithmetic), // D1 - grp2 r/m32, 1
    with_modrm(Arithmetic), // D2 - grp2 r/m8, CL
    with_modrm(Arithmetic), // D3 - grp2 r/m32, CL
    INVALID,                // D4 - AAM
    INVALID,                // D5 - AAD
    INVALID,                // D6
    simple(DataMov),        // D7 - XLAT/XLATB
    with_modrm(Arithmetic), // D8 - x87 escape
    with_modrm(Arithmetic), // D9 - x87 escape
    with_modrm(Arithmetic), // DA - x87 escape
    with_modrm(Arithmetic), // DB - x87 escape
    with_modrm(Arithmetic), // DC - x87 escape
    with_modrm(Arithmetic), // DD - x87 escape
    with_modrm(Arithmetic), // DE - x87 escape
    with_modrm(Arithmetic), // DF - x87 escape
    // 0xE0-0xEF: loops, I/O, near branches
    with_imm8(Control),  // E0 - LOOPNE/LOOPNZ rel8
    with_imm8(Control),  // E1 - LOOPE/LOOPZ rel8
    with_imm8(Control),  // E2 - LOOP rel8
    with_imm8(Control),  // E3 - JCXZ/JECXZ rel8
    with_imm8(Simple),   // E4 - IN AL, imm8
    with_imm8(Simple),   // E5 - IN EAX, imm8
    with_imm8(Simple),   // E6 - OUT imm8, AL
    with_imm8(Simple),   // E7 - OUT imm8, EAX
    with_imm32(Control), // E8 - CALL rel32
    with_imm32(Control), // E9 - JMP rel32
    with_imm32(Control), // EA - JMPF ptr16:32
    with_imm8(Control),  // EB - JMP rel8
    simple(Simple),      // EC - IN AL, DX
    simple(Simple),      // ED - IN EAX, DX
    simple(Simple),      // EE - OUT DX, AL
    simple(Simple),      // EF - OUT DX, EAX
    // 0xF0-0xFF: prefixes, flag ops, grp3/grp4/grp5
    INVALID,                // F0 - LOCK prefix
    simple(System),         // F1 - INT1/ICEBP
    INVALID,                // F2 - REPNE/REPNZ prefix
    INVALID,                // F3 - REP/REPE/REPZ prefix
    simple(System),         // F4 - HLT
    simple(System),         // F5 - CMC
    with_modrm(Arithmetic), // F6 - grp3 r/m8
    with_modrm(Arithmetic), // F7 - grp3 r/m32
    simple(System),         // F8 - CLC
    simple(System),         // F9 - STC
    simple(System),         // FA - CLI
    simple(System),         // FB - STI
    simple(System),         // FC - CLD
    simple(System),         // FD - STD
    with_modrm(Arithmetic), // FE - INC/DEC r/m8
    with_modrm(Arithmetic), // FF - INC/DEC/CALL/JMP/PUSH r/m32
];
