//! The debug probe, as far as chipmap is concerned.
//!
//! The transport itself (SWD or JTAG, USB probe firmware) lives outside of this crate.
//! chipmap only talks to it through the [`DebugProbe`] trait and the access ports and
//! CPUs it exposes, and reports its failures as an [`AccessError`].

/// A bus transaction on the debug transport failed.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum AccessError {
    /// The transaction timed out.
    Timeout,

    /// The target did not acknowledge the transaction.
    Nack,

    /// The bus reported a fault while accessing address {0:#010x}.
    Fault(u64),

    /// The debug probe is no longer connected.
    Disconnected,

    /// The transport reported an error.
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AccessError {
    /// Wraps an error of the transport implementation.
    pub fn transport<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AccessError::Transport(Box::new(source))
    }
}

/// The probe-wide controls of a debug connection.
pub trait DebugProbe {
    /// Sets the frequency of the debug clock.
    ///
    /// Returns the frequency the probe actually selected, which can be lower than
    /// the requested one.
    fn set_clock_frequency(&mut self, frequency_hz: u32) -> Result<u32, AccessError>;
}
