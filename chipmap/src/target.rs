use crate::{
    config::DeviceMap,
    core::CpuInterface,
    device::{Device, DeviceAccess},
    probe::AccessError,
    Error, Session,
};

/// Identification values read from the chip when the target is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChipIdentity {
    /// The 96-bit unique device ID.
    pub unique_id: [u8; 12],
    /// Installed flash in bytes.
    pub flash_size: u64,
    /// Package code, on chips that report one.
    pub package: Option<u8>,
    /// The value of the DBGMCU IDCODE register.
    pub mcu_idcode: u32,
}

/// An identified chip.
///
/// The target owns the session it was identified on, and with it the access ports
/// and CPUs, plus the devices of the chip in the order they were added.
#[derive(Debug)]
pub struct Target {
    name: &'static str,
    clock_max_hz: u32,
    identity: ChipIdentity,
    session: Session,
    devices: Vec<Device>,
}

impl Target {
    /// Creates a target without devices.
    pub fn new(
        name: &'static str,
        clock_max_hz: u32,
        identity: ChipIdentity,
        session: Session,
    ) -> Self {
        Target {
            name,
            clock_max_hz,
            identity,
            session,
            devices: Vec::new(),
        }
    }

    /// The name of the chip family.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The highest debug clock frequency the chip supports.
    pub fn clock_max_hz(&self) -> u32 {
        self.clock_max_hz
    }

    /// Identification values read from the chip.
    pub fn identity(&self) -> &ChipIdentity {
        &self.identity
    }

    /// The underlying debug session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Adds a device.
    ///
    /// Fails if the name is taken or the device is behind an access port the session
    /// does not have.
    pub fn add_device(&mut self, device: Device) -> Result<(), Error> {
        if self.devices.iter().any(|d| d.name() == device.name()) {
            return Err(Error::DuplicateDevice(device.name().to_string()));
        }
        if !self.session.has_access_port(device.access_port()) {
            return Err(Error::AccessPortNotFound(device.access_port()));
        }

        tracing::trace!(
            "Adding {} at {:#010x} on AP {}",
            device.name(),
            device.base_address(),
            device.access_port()
        );
        self.devices.push(device);

        Ok(())
    }

    /// Adds all devices of a device map, in order.
    ///
    /// Stops at the first device that fails to validate; the devices before it stay added.
    pub fn add_devices(&mut self, map: &DeviceMap) -> Result<(), Error> {
        for description in &map.devices {
            self.add_device(Device::from_description(description)?)?;
        }
        Ok(())
    }

    /// All devices, in the order they were added.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Returns `true` if there is a device with this name.
    pub fn has_device(&self, name: &str) -> bool {
        self.devices.iter().any(|device| device.name() == name)
    }

    /// Accesses the device with the given name.
    pub fn device(&mut self, name: &str) -> Result<DeviceAccess<'_>, Error> {
        let device = self
            .devices
            .iter()
            .find(|device| device.name() == name)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))?;
        let port = self
            .session
            .access_port_mut(device.access_port())
            .ok_or(Error::AccessPortNotFound(device.access_port()))?;

        Ok(DeviceAccess::new(device, port))
    }

    /// Corrects the size of a memory device after construction.
    pub fn resize_device(&mut self, name: &str, size: u64) -> Result<(), Error> {
        self.devices
            .iter_mut()
            .find(|device| device.name() == name)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))?
            .set_size(size)
    }

    /// Enables the clock of a peripheral through the clock controller that gates it.
    pub fn enable_peripheral(&mut self, peripheral: &str) -> Result<(), Error> {
        let controller = self
            .devices
            .iter()
            .find(|device| device.enable_bit(peripheral).is_some())
            .map(|device| device.name().to_string())
            .ok_or_else(|| Error::UnknownPeripheral(peripheral.to_string()))?;

        self.device(&controller)?.enable(peripheral)
    }

    /// Sets the debug clock to the highest frequency the chip supports.
    ///
    /// Returns the frequency the probe selected.
    pub fn set_debug_clock_to_max(&mut self) -> Result<u32, Error> {
        let selected = self.session.set_clock_frequency(self.clock_max_hz)?;
        tracing::debug!(
            "Requested a {} Hz debug clock, got {} Hz",
            self.clock_max_hz,
            selected
        );
        Ok(selected)
    }

    /// Returns `true` if every selected CPU is halted.
    ///
    /// `None` or an empty selection selects all CPUs. The CPUs are queried in the
    /// given order, or in probe order, and the query stops at the first running one.
    pub fn is_halted(&mut self, cpus: Option<&[usize]>) -> Result<bool, Error> {
        let mut all_halted = true;
        self.for_each_cpu(cpus, |cpu| {
            all_halted = cpu.is_halted()?;
            Ok(all_halted)
        })?;
        Ok(all_halted)
    }

    /// Halts the selected CPUs, `None` or an empty selection meaning all of them.
    ///
    /// The first failure aborts the call. CPUs handled before it stay halted.
    pub fn halt(&mut self, cpus: Option<&[usize]>) -> Result<(), Error> {
        self.for_each_cpu(cpus, |cpu| cpu.halt().map(|()| true))
    }

    /// Resets and halts the selected CPUs, `None` or an empty selection meaning all of them.
    ///
    /// The first failure aborts the call. CPUs handled before it are not rolled back.
    pub fn reset_halt(&mut self, cpus: Option<&[usize]>) -> Result<(), Error> {
        self.for_each_cpu(cpus, |cpu| cpu.reset_halt().map(|()| true))
    }

    /// Resumes the selected CPUs, `None` or an empty selection meaning all of them.
    ///
    /// The first failure aborts the call. CPUs handled before it keep running.
    pub fn resume(&mut self, cpus: Option<&[usize]>) -> Result<(), Error> {
        self.for_each_cpu(cpus, |cpu| cpu.resume().map(|()| true))
    }

    /// Runs `operation` on each selected CPU until it fails or returns `false`.
    fn for_each_cpu(
        &mut self,
        cpus: Option<&[usize]>,
        mut operation: impl FnMut(&mut dyn CpuInterface) -> Result<bool, AccessError>,
    ) -> Result<(), Error> {
        let all: Vec<usize>;
        let selection = match cpus {
            Some(selection) if !selection.is_empty() => selection,
            _ => {
                all = (0..self.session.cpu_count()).collect();
                &all
            }
        };

        for &index in selection {
            let cpu = self
                .session
                .cpu_mut(index)
                .ok_or(Error::CpuNotFound(index))?;

            match operation(cpu) {
                Ok(true) => {}
                Ok(false) => break,
                Err(source) => return Err(Error::Cpu { index, source }),
            }
        }

        Ok(())
    }

    /// Consumes the target, handing back the session.
    pub fn into_session(self) -> Session {
        self.session
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MCU_IDCODE 0x{:08X}", self.name, self.identity.mcu_idcode)
    }
}
