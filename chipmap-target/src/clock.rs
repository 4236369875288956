use crate::serialize::hex_u_int;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Location of the clock enable bit of one peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnableBit {
    /// Name of the gated peripheral.
    pub peripheral: Cow<'static, str>,
    /// Offset of the enable register within the clock controller.
    #[serde(serialize_with = "hex_u_int")]
    pub offset: u64,
    /// Position of the enable bit.
    pub bit: u8,
}

impl EnableBit {
    /// Creates a table entry.
    pub const fn new(peripheral: &'static str, offset: u64, bit: u8) -> Self {
        assert!(bit < 32, "enable bits live in 32-bit registers");

        Self {
            peripheral: Cow::Borrowed(peripheral),
            offset,
            bit,
        }
    }

    /// The mask of the enable bit within its register.
    pub fn mask(&self) -> u32 {
        1u32.checked_shl(u32::from(self.bit)).unwrap_or(0)
    }
}
