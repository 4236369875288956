//! Devices: named register collections at a base address behind an access port.

mod access;

pub use access::DeviceAccess;

use crate::Error;
use chipmap_target::{DeviceDescription, DeviceKind, EnableBit, RegisterDescriptor};
use std::collections::HashSet;

/// A peripheral or memory window of an identified chip.
///
/// A device only describes where its registers live. Reading and writing them
/// goes through a [`DeviceAccess`], which pairs the device with its access port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: String,
    access_port: u8,
    base_address: u64,
    kind: DeviceKind,
    registers: Vec<RegisterDescriptor>,
}

impl Device {
    /// Creates a device, checking the register layouts and the uniqueness of the register names.
    ///
    /// Every register must end up at an address aligned to its size, so that an
    /// access never straddles two bus words.
    pub fn new(
        name: impl Into<String>,
        access_port: u8,
        base_address: u64,
        kind: DeviceKind,
        registers: Vec<RegisterDescriptor>,
    ) -> Result<Self, Error> {
        let name = name.into();

        let mut names = HashSet::with_capacity(registers.len());
        for register in &registers {
            register.validate()?;
            let aligned = base_address
                .checked_add(register.offset())
                .is_some_and(|address| address % u64::from(register.size()) == 0);
            if !aligned {
                return Err(Error::InvalidRegisterAddress {
                    device: name,
                    register: register.name().to_string(),
                });
            }
            if !names.insert(register.name()) {
                return Err(Error::DuplicateRegister {
                    device: name,
                    register: register.name().to_string(),
                });
            }
        }

        Ok(Device {
            name,
            access_port,
            base_address,
            kind,
            registers,
        })
    }

    /// Creates a plain peripheral.
    pub fn peripheral(
        name: impl Into<String>,
        access_port: u8,
        base_address: u64,
        registers: &[RegisterDescriptor],
    ) -> Result<Self, Error> {
        Self::new(
            name,
            access_port,
            base_address,
            DeviceKind::Registers,
            registers.to_vec(),
        )
    }

    /// Creates a memory window without registers.
    pub fn memory(name: impl Into<String>, access_port: u8, base_address: u64, size: u64) -> Self {
        Device {
            name: name.into(),
            access_port,
            base_address,
            kind: DeviceKind::Memory { size },
            registers: Vec::new(),
        }
    }

    /// Creates a clock controller gating the peripherals in `enable_bits`.
    pub fn clock_control(
        name: impl Into<String>,
        access_port: u8,
        base_address: u64,
        registers: &[RegisterDescriptor],
        enable_bits: &'static [EnableBit],
    ) -> Result<Self, Error> {
        Self::new(
            name,
            access_port,
            base_address,
            DeviceKind::clock_control(enable_bits),
            registers.to_vec(),
        )
    }

    /// Instantiates a device from a device map entry.
    pub fn from_description(description: &DeviceDescription) -> Result<Self, Error> {
        Self::new(
            description.name.clone(),
            description.access_port,
            description.base_address,
            description.kind.clone(),
            description.expanded_registers()?,
        )
    }

    /// The name of the device, unique within its target.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the access port the device is reached through.
    pub fn access_port(&self) -> u8 {
        self.access_port
    }

    /// The address register offsets are relative to.
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// The kind of the device.
    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    /// The size of a memory device in bytes, `None` for other devices.
    pub fn size(&self) -> Option<u64> {
        match self.kind {
            DeviceKind::Memory { size } => Some(size),
            _ => None,
        }
    }

    pub(crate) fn set_size(&mut self, new_size: u64) -> Result<(), Error> {
        match &mut self.kind {
            DeviceKind::Memory { size } => {
                tracing::debug!("Resizing {} from {:#x} to {:#x}", self.name, size, new_size);
                *size = new_size;
                Ok(())
            }
            _ => Err(Error::NotAMemoryDevice(self.name.clone())),
        }
    }

    /// All registers, in declaration order.
    pub fn registers(&self) -> &[RegisterDescriptor] {
        &self.registers
    }

    /// Looks up a register by name.
    pub fn register(&self, name: &str) -> Result<&RegisterDescriptor, Error> {
        self.registers
            .iter()
            .find(|register| register.name() == name)
            .ok_or_else(|| Error::UnknownRegister {
                device: self.name.clone(),
                register: name.to_string(),
            })
    }

    /// The enable bit of `peripheral`, if this is a clock controller gating it.
    pub fn enable_bit(&self, peripheral: &str) -> Option<&EnableBit> {
        match &self.kind {
            DeviceKind::ClockControl { enable_bits } => enable_bits
                .iter()
                .find(|enable_bit| enable_bit.peripheral == peripheral),
            _ => None,
        }
    }
}
