use super::Device;
use crate::{
    architecture::arm::AccessPort,
    error::{Direction, InvalidArgument},
    Error,
};
use chipmap_target::{Field, RegisterDescriptor};

/// A device bound to the access port it lives behind.
///
/// Registers are accessed through 32-bit bus transactions issued in the order of
/// the calls. A word register is read or written with exactly one transaction at
/// `base_address + offset`. A byte or halfword register is read from its lane of the
/// containing word, and written with a read-modify-write of that word, so the other
/// lanes keep their contents. Field updates are read-modify-write sequences and not
/// atomic.
pub struct DeviceAccess<'a> {
    device: &'a Device,
    port: &'a mut dyn AccessPort,
}

impl<'a> DeviceAccess<'a> {
    pub(crate) fn new(device: &'a Device, port: &'a mut dyn AccessPort) -> Self {
        DeviceAccess { device, port }
    }

    /// The device being accessed.
    pub fn device(&self) -> &'a Device {
        self.device
    }

    /// Reads a register.
    pub fn read(&mut self, register: &RegisterDescriptor) -> Result<u32, Error> {
        if !register.access().is_readable() {
            return Err(access_violation(register, Direction::Read));
        }

        let address = self.device.base_address() + register.offset();
        let (word_address, lane) = word_lane(address);
        let value = (self.port.read_word_32(word_address)? >> lane) & register.value_mask();

        tracing::trace!(
            "{}.{} ({:#010x}) -> {:#010x}",
            self.device.name(),
            register.name(),
            address,
            value
        );

        Ok(value)
    }

    /// Writes a register.
    pub fn write(&mut self, register: &RegisterDescriptor, value: u32) -> Result<(), Error> {
        if !register.access().is_writable() {
            return Err(access_violation(register, Direction::Write));
        }

        let address = self.device.base_address() + register.offset();
        let value = value & register.value_mask();

        tracing::trace!(
            "{}.{} ({:#010x}) <- {:#010x}",
            self.device.name(),
            register.name(),
            address,
            value
        );

        let (word_address, lane) = word_lane(address);
        if register.size() == 4 {
            self.port.write_word_32(address, value)?;
        } else {
            let lane_mask = register.value_mask() << lane;
            let word = self.port.read_word_32(word_address)?;
            self.port.write_word_32(word_address, (word & !lane_mask) | (value << lane))?;
        }

        Ok(())
    }

    /// Reads a register and extracts one of its fields.
    pub fn get_field(
        &mut self,
        register: &RegisterDescriptor,
        field: &Field,
    ) -> Result<u32, Error> {
        Ok(field.extract(self.read(register)?))
    }

    /// Replaces one field of a register, leaving the other bits untouched.
    ///
    /// Fails without any bus traffic if `value` does not fit into the field.
    pub fn set_field(
        &mut self,
        register: &RegisterDescriptor,
        field: &Field,
        value: u32,
    ) -> Result<(), Error> {
        // Check before touching the bus.
        field.insert(0, value)?;
        if !register.access().is_writable() {
            return Err(access_violation(register, Direction::Write));
        }

        let current = self.read(register)?;
        let updated = field.insert(current, value)?;
        self.write(register, updated)
    }

    /// Reads the register with the given name.
    pub fn read_register(&mut self, name: &str) -> Result<u32, Error> {
        let register = self.device.register(name)?;
        self.read(register)
    }

    /// Writes the register with the given name.
    pub fn write_register(&mut self, name: &str, value: u32) -> Result<(), Error> {
        let register = self.device.register(name)?;
        self.write(register, value)
    }

    /// Reads a field of a register, both given by name.
    pub fn read_field(&mut self, register: &str, field: &str) -> Result<u32, Error> {
        let (register, field) = self.lookup_field(register, field)?;
        self.get_field(register, field)
    }

    /// Writes a field of a register, both given by name.
    pub fn write_field(&mut self, register: &str, field: &str, value: u32) -> Result<(), Error> {
        let (register, field) = self.lookup_field(register, field)?;
        self.set_field(register, field, value)
    }

    fn lookup_field(
        &self,
        register: &str,
        field: &str,
    ) -> Result<(&'a RegisterDescriptor, &'a Field), Error> {
        let device: &'a Device = self.device;
        let register = device.register(register)?;
        let field = register.field(field).ok_or_else(|| Error::UnknownField {
            register: register.name().to_string(),
            field: field.to_string(),
        })?;

        Ok((register, field))
    }

    /// Reads every readable register, in declaration order.
    ///
    /// The first failing read fails the whole dump.
    pub fn dump(&mut self) -> Result<Vec<(&'a str, u32)>, Error> {
        let device: &'a Device = self.device;
        let mut values = Vec::with_capacity(device.registers().len());

        for register in device.registers() {
            if register.access().is_readable() {
                values.push((register.name(), self.read(register)?));
            }
        }

        Ok(values)
    }

    /// Reads `len` bytes at the absolute address `address`.
    pub fn read_mem_block(&mut self, address: u64, len: usize) -> Result<Vec<u8>, Error> {
        Ok(self.port.read_bulk(address, len)?)
    }

    /// Enables the clock of `peripheral` if it is not enabled yet.
    ///
    /// The enable register is read once. It is only written when the bit is clear,
    /// since setting an enable bit again can have side effects.
    pub fn enable(&mut self, peripheral: &str) -> Result<(), Error> {
        let enable_bit = self
            .device
            .enable_bit(peripheral)
            .ok_or_else(|| Error::UnknownPeripheral(peripheral.to_string()))?;

        let address = self.device.base_address() + enable_bit.offset;
        let value = self.port.read_word_32(address)?;

        if value & enable_bit.mask() != 0 {
            tracing::trace!("{} is already enabled", peripheral);
            return Ok(());
        }

        tracing::trace!(
            "Enabling {} in {}: {:#010x} <- {:#010x}",
            peripheral,
            self.device.name(),
            address,
            value | enable_bit.mask()
        );
        self.port.write_word_32(address, value | enable_bit.mask())?;

        Ok(())
    }
}

/// Splits an address into its containing aligned word and the bit position of the
/// address within that word.
fn word_lane(address: u64) -> (u64, u32) {
    (address & !3, (address & 3) as u32 * 8)
}

fn access_violation(register: &RegisterDescriptor, direction: Direction) -> Error {
    InvalidArgument::AccessViolation {
        register: register.name().to_string(),
        direction,
    }
    .into()
}
