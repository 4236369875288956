use crate::probe::AccessError;

/// Run control of a single CPU discovered on the debug session.
///
/// Every call blocks until the transport has completed it.
pub trait CpuInterface {
    /// Returns `true` if the CPU is halted.
    fn is_halted(&mut self) -> Result<bool, AccessError>;

    /// Halts the CPU.
    fn halt(&mut self) -> Result<(), AccessError>;

    /// Resets the CPU and halts it before the first instruction executes.
    fn reset_halt(&mut self) -> Result<(), AccessError>;

    /// Lets a halted CPU run again.
    fn resume(&mut self) -> Result<(), AccessError>;
}
