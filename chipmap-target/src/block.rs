use crate::{
    register::{LayoutError, RegisterDescriptor},
    serialize::hex_u_int,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A register template replicated for several identical hardware units.
///
/// Peripherals such as the ADCs of an STM32G4 come as a number of blocks sharing
/// one register layout at successive addresses. The template describes a single
/// block; [`RegisterArray::expand`] produces the concrete registers of every unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterArray {
    /// Distance in bytes between two consecutive units.
    #[serde(serialize_with = "hex_u_int")]
    pub stride: u64,
    /// Index used in the name of the first unit.
    #[serde(default)]
    pub first_index: u32,
    /// Number of units.
    pub count: u32,
    /// Registers of a single unit, with offsets relative to the unit.
    pub registers: Cow<'static, [RegisterDescriptor]>,
}

impl RegisterArray {
    /// Creates an array of `count` units, numbered from `first_index`.
    pub const fn new(
        stride: u64,
        first_index: u32,
        count: u32,
        registers: &'static [RegisterDescriptor],
    ) -> Self {
        Self {
            stride,
            first_index,
            count,
            registers: Cow::Borrowed(registers),
        }
    }

    /// Produces the registers of all units.
    ///
    /// Unit `i` gets every template register at `i * stride + offset`, named
    /// `<name>_<first_index + i>`. The result is ordered unit by unit. A unit whose
    /// index or offset does not fit yields an error instead of wrapping around.
    pub fn expand(&self) -> impl Iterator<Item = Result<RegisterDescriptor, LayoutError>> + '_ {
        (0..self.count).flat_map(move |i| {
            self.registers
                .iter()
                .map(move |register| self.instance(register, i))
        })
    }

    fn instance(
        &self,
        register: &RegisterDescriptor,
        unit: u32,
    ) -> Result<RegisterDescriptor, LayoutError> {
        let index = self
            .first_index
            .checked_add(unit)
            .ok_or_else(|| LayoutError::IndexOverflow {
                register: register.name().to_string(),
                first_index: self.first_index,
                count: self.count,
            })?;
        let delta = u64::from(unit)
            .checked_mul(self.stride)
            .ok_or_else(|| LayoutError::OffsetOverflow {
                register: register.name().to_string(),
            })?;

        register.instance(index, delta)
    }

    /// The number of registers [`RegisterArray::expand`] produces.
    pub fn len(&self) -> usize {
        self.registers.len().saturating_mul(self.count as usize)
    }

    /// Returns `true` if the array expands to no registers at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
