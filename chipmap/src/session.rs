use crate::{architecture::arm::AccessPort, core::CpuInterface, probe::AccessError, DebugProbe};
use std::collections::BTreeMap;

/// An open debug session, as handed over by the transport.
///
/// The session holds the probe, the access ports found by scanning the debug port,
/// indexed by their APSEL, and the CPUs discovered on them in probe order. It is
/// consumed by [`Catalog::identify`](crate::catalog::Catalog::identify), and owned by
/// the resulting [`Target`](crate::Target) for the rest of the debug session.
pub struct Session {
    probe: Box<dyn DebugProbe>,
    access_ports: BTreeMap<u8, Box<dyn AccessPort>>,
    cpus: Vec<Box<dyn CpuInterface>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_ports", &self.access_ports.keys().collect::<Vec<_>>())
            .field("cpus", &self.cpus.len())
            .finish()
    }
}

impl Session {
    /// Creates a session without access ports or CPUs.
    pub fn new(probe: Box<dyn DebugProbe>) -> Self {
        Session {
            probe,
            access_ports: BTreeMap::new(),
            cpus: Vec::new(),
        }
    }

    /// Adds the access port with the given index, replacing any previous one.
    pub fn with_access_port(mut self, index: u8, access_port: Box<dyn AccessPort>) -> Self {
        self.access_ports.insert(index, access_port);
        self
    }

    /// Adds the next CPU in probe order.
    pub fn with_cpu(mut self, cpu: Box<dyn CpuInterface>) -> Self {
        self.cpus.push(cpu);
        self
    }

    /// The indices of all access ports, in ascending order.
    pub fn access_port_indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.access_ports.keys().copied()
    }

    /// Returns `true` if there is an access port with this index.
    pub fn has_access_port(&self, index: u8) -> bool {
        self.access_ports.contains_key(&index)
    }

    /// The access port with the given index.
    pub fn access_port(&self, index: u8) -> Option<&dyn AccessPort> {
        self.access_ports.get(&index).map(|port| port.as_ref())
    }

    /// The access port with the given index.
    pub fn access_port_mut(&mut self, index: u8) -> Option<&mut (dyn AccessPort + 'static)> {
        self.access_ports.get_mut(&index).map(|port| port.as_mut())
    }

    /// The number of CPUs.
    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    /// The CPU at the given position in probe order.
    pub fn cpu_mut(&mut self, index: usize) -> Option<&mut (dyn CpuInterface + 'static)> {
        self.cpus.get_mut(index).map(|cpu| cpu.as_mut())
    }

    /// Sets the frequency of the debug clock, returning the one actually selected.
    pub fn set_clock_frequency(&mut self, frequency_hz: u32) -> Result<u32, AccessError> {
        self.probe.set_clock_frequency(frequency_hz)
    }
}
