//! The register file of the target machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// The 32 registers, in register-file order
///
/// `zero` always reads as 0, `sp` is the stack pointer and `lr` holds the
/// return address. `a0..a5` carry call arguments, `v0`/`v1` carry return
/// values, `s0..s19` are the allocatable saved registers. `temp` is the
/// reserved scratch name; the generator allocates constants into saved
/// registers instead of writing to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    Zero = 0,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    Temp,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
    S11,
    S12,
    S13,
    S14,
    S15,
    S16,
    S17,
    S18,
    S19,
    Sp,
    Lr,
}

const _: () = assert!(Register::Lr as u8 == 31);

impl Register {
    /// The argument registers, in argument order
    pub const ARGS: [Register; 6] = [
        Register::A0,
        Register::A1,
        Register::A2,
        Register::A3,
        Register::A4,
        Register::A5,
    ];

    /// The allocatable saved registers, in allocation scan order
    pub const SAVED: [Register; 20] = [
        Register::S0,
        Register::S1,
        Register::S2,
        Register::S3,
        Register::S4,
        Register::S5,
        Register::S6,
        Register::S7,
        Register::S8,
        Register::S9,
        Register::S10,
        Register::S11,
        Register::S12,
        Register::S13,
        Register::S14,
        Register::S15,
        Register::S16,
        Register::S17,
        Register::S18,
        Register::S19,
    ];

    /// The register's number in the file, as encoded into instructions
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Zero => write!(f, "zero"),
            Register::V0 => write!(f, "v0"),
            Register::V1 => write!(f, "v1"),
            Register::Sp => write!(f, "sp"),
            Register::Lr => write!(f, "lr"),
            Register::Temp => write!(f, "temp"),
            arg @ (Register::A0
            | Register::A1
            | Register::A2
            | Register::A3
            | Register::A4
            | Register::A5) => write!(f, "a{}", arg.number() - Register::A0.number()),
            saved => write!(f, "s{}", saved.number() - Register::S0.number()),
        }
    }
}
