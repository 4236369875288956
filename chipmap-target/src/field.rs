use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A named bit range within a register value.
///
/// A field with an empty name marks reserved bits. Reserved fields take part in the
/// layout of a register but are skipped by [`RegisterDescriptor::named_fields`].
///
/// [`RegisterDescriptor::named_fields`]: crate::RegisterDescriptor::named_fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    #[serde(default)]
    name: Cow<'static, str>,
    width: u8,
    shift: u8,
}

impl Field {
    /// Creates a field `width` bits wide, starting at bit `shift`.
    pub const fn new(name: &'static str, width: u8, shift: u8) -> Self {
        assert!(width > 0, "fields must be at least one bit wide");
        assert!(
            width as u32 + shift as u32 <= 32,
            "fields must fit into a 32-bit register"
        );

        Self {
            name: Cow::Borrowed(name),
            width,
            shift,
        }
    }

    /// Creates a single-bit field.
    pub const fn bit(name: &'static str, bit: u8) -> Self {
        Self::new(name, 1, bit)
    }

    /// Creates a field covering the inclusive bit range `low..=high`.
    pub const fn bits(name: &'static str, low: u8, high: u8) -> Self {
        assert!(high >= low, "bit ranges are written low to high");
        Self::new(name, high - low + 1, low)
    }

    /// Creates an unnamed field marking reserved bits.
    pub const fn reserved(width: u8, shift: u8) -> Self {
        Self::new("", width, shift)
    }

    pub(crate) fn owned(name: String, width: u8, shift: u8) -> Self {
        Self {
            name: Cow::Owned(name),
            width,
            shift,
        }
    }

    /// The name of the field, empty for reserved bits.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the field marks reserved bits.
    pub fn is_reserved(&self) -> bool {
        self.name.is_empty()
    }

    /// The number of bits covered by the field.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// The position of the least significant bit of the field.
    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// The bit position just past the most significant bit of the field.
    pub fn end(&self) -> u32 {
        u32::from(self.shift) + u32::from(self.width)
    }

    /// The number of hex digits needed to print a value of this field.
    pub fn nibble_width(&self) -> u8 {
        self.width.div_ceil(4)
    }

    /// The unshifted mask of the field, `(1 << width) - 1`.
    pub fn mask(&self) -> u32 {
        u32::MAX
            .checked_shr(32u32.saturating_sub(u32::from(self.width)))
            .unwrap_or(0)
    }

    /// Extracts the value of this field from a register value.
    pub fn extract(&self, register_value: u32) -> u32 {
        register_value
            .checked_shr(u32::from(self.shift))
            .unwrap_or(0)
            & self.mask()
    }

    /// Replaces the bits of this field in `register_value` with `value`.
    ///
    /// Fails if `value` has bits set outside of the width of the field.
    pub fn insert(&self, register_value: u32, value: u32) -> Result<u32, FieldOverflow> {
        let mask = self.mask();
        if value & !mask != 0 {
            return Err(FieldOverflow {
                field: self.name.to_string(),
                value,
                width: self.width,
            });
        }

        let shift = u32::from(self.shift);
        let cleared = register_value & !mask.checked_shl(shift).unwrap_or(0);

        Ok(cleared | value.checked_shl(shift).unwrap_or(0))
    }
}

/// Value {value:#x} does not fit into the {width}-bit field '{field}'.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub struct FieldOverflow {
    /// Name of the field.
    pub field: String,
    /// The rejected value.
    pub value: u32,
    /// Width of the field in bits.
    pub width: u8,
}
