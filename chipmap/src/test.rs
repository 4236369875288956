//! Helpers for testing the crate
//!
//! The mocks keep their state behind a shared handle, so a test can hand a mock to a
//! [`Session`](crate::Session) and still inspect what happened to it afterwards.

use crate::{
    architecture::arm::{AccessPort, AccessPortKind, Component},
    core::CpuInterface,
    probe::{AccessError, DebugProbe},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

/// A bus transaction seen by a [`MockAccessPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// A 32-bit read at the address.
    Read(u64),
    /// A 32-bit write of the value at the address.
    Write(u64, u32),
}

#[derive(Debug, Default)]
struct Bus {
    memory: BTreeMap<u64, u32>,
    faults: BTreeSet<u64>,
    transactions: Vec<Transaction>,
}

/// An access port backed by a sparse word memory.
///
/// Unset words read as zero. Every transaction is recorded, including the ones
/// that fail because of an injected fault.
#[derive(Debug, Clone)]
pub struct MockAccessPort {
    kind: AccessPortKind,
    base_component: Option<Component>,
    bus: Rc<RefCell<Bus>>,
}

impl MockAccessPort {
    /// Creates an access port of the given kind without a ROM table.
    pub fn new(kind: AccessPortKind) -> Self {
        MockAccessPort {
            kind,
            base_component: None,
            bus: Rc::default(),
        }
    }

    /// Creates an AHB access port.
    pub fn ahb() -> Self {
        Self::new(AccessPortKind::Ahb)
    }

    /// Creates an APB access port.
    pub fn apb() -> Self {
        Self::new(AccessPortKind::Apb)
    }

    /// Sets the root component behind the port.
    pub fn with_base_component(mut self, component: Component) -> Self {
        self.base_component = Some(component);
        self
    }

    /// Returns a second handle on the same simulated bus.
    pub fn handle(&self) -> MockAccessPort {
        self.clone()
    }

    /// Stores a word without recording a transaction.
    pub fn set_word(&self, address: u64, value: u32) {
        self.bus.borrow_mut().memory.insert(address, value);
    }

    /// Stores bytes starting at a word aligned address, without recording transactions.
    pub fn set_bytes(&self, address: u64, data: &[u8]) {
        assert_eq!(address % 4, 0, "mock memory is word aligned");

        for (i, chunk) in data.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.set_word(address + 4 * i as u64, u32::from_le_bytes(word));
        }
    }

    /// Returns the stored word without recording a transaction.
    pub fn word(&self, address: u64) -> u32 {
        self.bus
            .borrow()
            .memory
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Makes every access to `address` fail with a bus fault.
    pub fn fail_at(&self, address: u64) {
        self.bus.borrow_mut().faults.insert(address);
    }

    /// All transactions so far, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.bus.borrow().transactions.clone()
    }

    /// The number of write transactions so far.
    pub fn write_count(&self) -> usize {
        self.bus
            .borrow()
            .transactions
            .iter()
            .filter(|transaction| matches!(transaction, Transaction::Write(..)))
            .count()
    }

    /// Forgets the recorded transactions.
    pub fn clear_transactions(&self) {
        self.bus.borrow_mut().transactions.clear();
    }

    fn record(&self, transaction: Transaction, address: u64) -> Result<(), AccessError> {
        let mut bus = self.bus.borrow_mut();
        bus.transactions.push(transaction);

        if address % 4 != 0 || bus.faults.contains(&address) {
            return Err(AccessError::Fault(address));
        }

        Ok(())
    }
}

impl AccessPort for MockAccessPort {
    fn kind(&self) -> AccessPortKind {
        self.kind
    }

    fn base_component(&self) -> Option<&Component> {
        self.base_component.as_ref()
    }

    fn read_word_32(&mut self, address: u64) -> Result<u32, AccessError> {
        self.record(Transaction::Read(address), address)?;
        Ok(self.word(address))
    }

    fn write_word_32(&mut self, address: u64, value: u32) -> Result<(), AccessError> {
        self.record(Transaction::Write(address, value), address)?;
        self.set_word(address, value);
        Ok(())
    }
}

/// A call made on a [`MockCpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuCall {
    /// [`CpuInterface::is_halted`]
    IsHalted,
    /// [`CpuInterface::halt`]
    Halt,
    /// [`CpuInterface::reset_halt`]
    ResetHalt,
    /// [`CpuInterface::resume`]
    Resume,
}

#[derive(Debug, Default)]
struct CpuState {
    halted: bool,
    fail_on: Option<CpuCall>,
    calls: Vec<CpuCall>,
}

/// A CPU that records the calls made on it.
#[derive(Debug, Clone, Default)]
pub struct MockCpu {
    state: Rc<RefCell<CpuState>>,
}

impl MockCpu {
    /// Creates a running CPU.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a halted CPU.
    pub fn halted() -> Self {
        let cpu = Self::default();
        cpu.state.borrow_mut().halted = true;
        cpu
    }

    /// Makes every call of the given kind fail with a timeout.
    pub fn failing_on(self, call: CpuCall) -> Self {
        self.state.borrow_mut().fail_on = Some(call);
        self
    }

    /// Returns a second handle on the same CPU.
    pub fn handle(&self) -> MockCpu {
        self.clone()
    }

    /// All calls so far, oldest first, failed ones included.
    pub fn calls(&self) -> Vec<CpuCall> {
        self.state.borrow().calls.clone()
    }

    /// Whether the simulated CPU is halted right now.
    pub fn is_halted_now(&self) -> bool {
        self.state.borrow().halted
    }

    fn call(&mut self, call: CpuCall) -> Result<bool, AccessError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);

        if state.fail_on == Some(call) {
            return Err(AccessError::Timeout);
        }

        match call {
            CpuCall::IsHalted => {}
            CpuCall::Halt | CpuCall::ResetHalt => state.halted = true,
            CpuCall::Resume => state.halted = false,
        }

        Ok(state.halted)
    }
}

impl CpuInterface for MockCpu {
    fn is_halted(&mut self) -> Result<bool, AccessError> {
        self.call(CpuCall::IsHalted)
    }

    fn halt(&mut self) -> Result<(), AccessError> {
        self.call(CpuCall::Halt).map(drop)
    }

    fn reset_halt(&mut self) -> Result<(), AccessError> {
        self.call(CpuCall::ResetHalt).map(drop)
    }

    fn resume(&mut self) -> Result<(), AccessError> {
        self.call(CpuCall::Resume).map(drop)
    }
}

/// A probe that accepts any clock frequency up to a limit.
#[derive(Debug, Clone)]
pub struct MockProbe {
    max_frequency_hz: u32,
    frequency_hz: Rc<RefCell<Option<u32>>>,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    /// Creates a probe supporting up to 50 MHz.
    pub fn new() -> Self {
        Self::with_max_frequency(50_000_000)
    }

    /// Creates a probe supporting up to the given frequency.
    pub fn with_max_frequency(max_frequency_hz: u32) -> Self {
        MockProbe {
            max_frequency_hz,
            frequency_hz: Rc::default(),
        }
    }

    /// Returns a second handle on the same probe.
    pub fn handle(&self) -> MockProbe {
        self.clone()
    }

    /// The last frequency selected, if any was set.
    pub fn clock_frequency(&self) -> Option<u32> {
        *self.frequency_hz.borrow()
    }
}

impl DebugProbe for MockProbe {
    fn set_clock_frequency(&mut self, frequency_hz: u32) -> Result<u32, AccessError> {
        let selected = frequency_hz.min(self.max_frequency_hz);
        *self.frequency_hz.borrow_mut() = Some(selected);
        Ok(selected)
    }
}
