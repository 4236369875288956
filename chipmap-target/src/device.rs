use crate::{
    block::RegisterArray,
    clock::EnableBit,
    register::{LayoutError, RegisterDescriptor},
    serialize::hex_u_int,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// What a device is, beyond its list of registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DeviceKind {
    /// A plain peripheral, only accessed through its registers.
    #[default]
    Registers,
    /// A memory window such as SRAM or flash.
    Memory {
        /// Size of the window in bytes.
        #[serde(serialize_with = "hex_u_int")]
        size: u64,
    },
    /// A clock controller that gates the clocks of other peripherals.
    ClockControl {
        /// Enable bit of each gated peripheral.
        enable_bits: Cow<'static, [EnableBit]>,
    },
}

impl DeviceKind {
    /// Creates a clock controller kind from a static enable table.
    pub const fn clock_control(enable_bits: &'static [EnableBit]) -> Self {
        Self::ClockControl {
            enable_bits: Cow::Borrowed(enable_bits),
        }
    }
}

/// Description of a device to attach to a target, as found in a device map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceDescription {
    /// Name of the device, unique within a target.
    pub name: String,
    /// Address the register offsets are relative to.
    #[serde(serialize_with = "hex_u_int")]
    pub base_address: u64,
    /// Index of the access port the device is reached through.
    #[serde(default)]
    pub access_port: u8,
    /// The kind of the device.
    #[serde(default)]
    pub kind: DeviceKind,
    /// Replicated register blocks, expanded before the shared registers.
    #[serde(default)]
    pub arrays: Vec<RegisterArray>,
    /// Registers that exist once.
    #[serde(default)]
    pub registers: Vec<RegisterDescriptor>,
}

impl DeviceDescription {
    /// All registers of the device in declaration order.
    ///
    /// Array units come first, in the order the arrays are listed, followed by the
    /// shared registers at their unscaled offsets.
    pub fn expanded_registers(&self) -> Result<Vec<RegisterDescriptor>, LayoutError> {
        let mut registers = Vec::new();

        for array in &self.arrays {
            for register in array.expand() {
                registers.push(register?);
            }
        }
        registers.extend(self.registers.iter().cloned());

        Ok(registers)
    }
}
