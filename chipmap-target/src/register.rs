use crate::{field::Field, serialize::hex_u_int};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The directions in which a register may be accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterAccess {
    /// The register can only be read.
    #[serde(rename = "r")]
    ReadOnly,
    /// The register can only be written.
    #[serde(rename = "w")]
    WriteOnly,
    /// The register can be read and written.
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl RegisterAccess {
    /// Returns `true` if the register can be read.
    pub fn is_readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Returns `true` if the register can be written.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

fn default_size() -> u8 {
    4
}

/// Static description of a single memory-mapped register.
///
/// The offset is relative to the base address of the device owning the register.
/// Fields are listed from the lowest to the highest bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterDescriptor {
    name: Cow<'static, str>,
    #[serde(serialize_with = "hex_u_int")]
    offset: u64,
    #[serde(default = "default_size")]
    size: u8,
    #[serde(default)]
    access: RegisterAccess,
    #[serde(default)]
    fields: Cow<'static, [Field]>,
}

impl RegisterDescriptor {
    /// Creates a 32-bit register description.
    pub const fn new(
        name: &'static str,
        offset: u64,
        access: RegisterAccess,
        fields: &'static [Field],
    ) -> Self {
        Self::sized(name, offset, 4, access, fields)
    }

    /// Creates a register description `size` bytes wide.
    pub const fn sized(
        name: &'static str,
        offset: u64,
        size: u8,
        access: RegisterAccess,
        fields: &'static [Field],
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            offset,
            size,
            access,
            fields: Cow::Borrowed(fields),
        }
    }

    /// Creates a 32-bit read-write register description.
    pub const fn rw(name: &'static str, offset: u64, fields: &'static [Field]) -> Self {
        Self::new(name, offset, RegisterAccess::ReadWrite, fields)
    }

    /// Creates a 32-bit read-only register description.
    pub const fn read_only(name: &'static str, offset: u64, fields: &'static [Field]) -> Self {
        Self::new(name, offset, RegisterAccess::ReadOnly, fields)
    }

    /// Creates a 32-bit write-only register description.
    pub const fn write_only(name: &'static str, offset: u64, fields: &'static [Field]) -> Self {
        Self::new(name, offset, RegisterAccess::WriteOnly, fields)
    }

    /// Returns a copy of this register renamed to `<name>_<index>` and moved by `delta` bytes.
    pub fn instance(&self, index: u32, delta: u64) -> Result<Self, LayoutError> {
        let offset = self
            .offset
            .checked_add(delta)
            .ok_or_else(|| LayoutError::OffsetOverflow {
                register: self.name.to_string(),
            })?;

        Ok(Self {
            name: Cow::Owned(format!("{}_{}", self.name, index)),
            offset,
            ..self.clone()
        })
    }

    /// The name of the register, unique within its device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The byte offset from the base address of the owning device.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The width of the register in bytes.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// The width of the register in bits.
    pub fn bits(&self) -> u32 {
        u32::from(self.size) * 8
    }

    /// The access rights of the register.
    pub fn access(&self) -> RegisterAccess {
        self.access
    }

    /// Mask of the bits actually held by the register.
    pub fn value_mask(&self) -> u32 {
        u32::MAX
            .checked_shr(32u32.saturating_sub(self.bits()))
            .unwrap_or(0)
    }

    /// The fields as declared, including explicitly reserved ones.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The fields that carry a name.
    pub fn named_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.is_reserved())
    }

    /// Looks up a named field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.named_fields().find(|field| field.name() == name)
    }

    /// Checks the size and alignment of the register, and that the fields are
    /// ordered, do not overlap and fit into it.
    ///
    /// Registers narrower than a word must lie within one aligned word, which is
    /// given when the offset is a multiple of the size.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !matches!(self.size, 1 | 2 | 4) {
            return Err(LayoutError::UnsupportedSize {
                register: self.name.to_string(),
                size: self.size,
            });
        }

        if self.offset % u64::from(self.size) != 0 {
            return Err(LayoutError::Misaligned {
                register: self.name.to_string(),
                offset: self.offset,
                size: self.size,
            });
        }

        let mut next_free_bit = 0;
        for field in self.fields.iter() {
            if field.width() == 0 {
                return Err(LayoutError::EmptyField {
                    register: self.name.to_string(),
                    field: field.name().to_string(),
                });
            }

            if u32::from(field.shift()) < next_free_bit {
                return Err(LayoutError::Overlap {
                    register: self.name.to_string(),
                    field: field.name().to_string(),
                    bit: field.shift(),
                });
            }

            if field.end() > self.bits() {
                return Err(LayoutError::TooWide {
                    register: self.name.to_string(),
                    field: field.name().to_string(),
                    bits: self.bits(),
                });
            }

            next_free_bit = field.end();
        }

        Ok(())
    }

    /// Returns the complete, contiguous layout of the register from bit 0 upwards.
    ///
    /// Gaps between declared fields, and the bits above the last one, are filled with
    /// reserved fields, so the widths of the returned fields always add up to the
    /// register width. Assumes a layout that passed [`RegisterDescriptor::validate`].
    pub fn layout(&self) -> Vec<Field> {
        let mut layout = Vec::with_capacity(self.fields.len() * 2 + 1);
        let mut next_free_bit = 0u32;

        for field in self.fields.iter() {
            let shift = u32::from(field.shift());
            if shift > next_free_bit {
                layout.push(reserved_gap(next_free_bit, shift));
            }
            layout.push(field.clone());
            next_free_bit = field.end();
        }

        if self.bits() > next_free_bit {
            layout.push(reserved_gap(next_free_bit, self.bits()));
        }

        layout
    }
}

fn reserved_gap(start: u32, end: u32) -> Field {
    // Both bounds are at most 32 for a validated layout.
    Field::owned(String::new(), (end - start) as u8, start as u8)
}

/// Errors in the static description of a register.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum LayoutError {
    /// Register '{register}' is {size} bytes wide; only 1, 2 and 4 byte registers are supported.
    UnsupportedSize { register: String, size: u8 },

    /// Register '{register}' at offset {offset:#x} is not aligned to its size of {size} bytes.
    Misaligned {
        register: String,
        offset: u64,
        size: u8,
    },

    /// The offset of register '{register}' does not fit into 64 bits.
    OffsetOverflow { register: String },

    /// Register '{register}' cannot be numbered from {first_index} for {count} units.
    IndexOverflow {
        register: String,
        first_index: u32,
        count: u32,
    },

    /// Field '{field}' of register '{register}' is zero bits wide.
    EmptyField { register: String, field: String },

    /// Field '{field}' of register '{register}' starts at bit {bit}, which is already taken or out of order.
    Overlap {
        register: String,
        field: String,
        bit: u8,
    },

    /// Field '{field}' does not fit into the {bits} bits of register '{register}'.
    TooWide {
        register: String,
        field: String,
        bits: u32,
    },
}
