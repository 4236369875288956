use crate::probe::AccessError;
use chipmap_target::{FieldOverflow, LayoutError};

/// The overarching error type which contains all possible errors as variants.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// A bus transaction failed.
    Access(#[from] AccessError),

    /// CPU {index} failed.
    Cpu {
        /// Position of the CPU in probe order.
        index: usize,
        /// The underlying transport failure.
        #[source]
        source: AccessError,
    },

    /// There is no CPU {0}.
    CpuNotFound(usize),

    /// There is no access port {0}.
    AccessPortNotFound(u8),

    /// There is no device named '{0}'.
    UnknownDevice(String),

    /// Device '{device}' has no register named '{register}'.
    UnknownRegister {
        /// Name of the device.
        device: String,
        /// Name of the requested register.
        register: String,
    },

    /// Register '{register}' has no field named '{field}'.
    UnknownField {
        /// Name of the register.
        register: String,
        /// Name of the requested field.
        field: String,
    },

    /// No clock controller knows the peripheral '{0}'.
    UnknownPeripheral(String),

    /// Invalid argument.
    InvalidArgument(#[from] InvalidArgument),

    /// A device named '{0}' already exists.
    DuplicateDevice(String),

    /// Device '{device}' declares register '{register}' more than once.
    DuplicateRegister {
        /// Name of the device.
        device: String,
        /// Name of the register.
        register: String,
    },

    /// Invalid register layout.
    Layout(#[from] LayoutError),

    /// Register '{register}' of device '{device}' does not lie at an address aligned to its size.
    InvalidRegisterAddress {
        /// Name of the device.
        device: String,
        /// Name of the register.
        register: String,
    },

    /// Device '{0}' is not a memory device.
    NotAMemoryDevice(String),

    /// Failed to parse the device map.
    DeviceMap(#[from] serde_yaml::Error),

    /// An error occurred.
    Other(#[from] anyhow::Error),
}

/// A caller asked for something a register cannot do.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum InvalidArgument {
    /// {0}
    FieldOverflow(#[from] FieldOverflow),

    /// Register '{register}' is not {direction}.
    AccessViolation {
        /// Name of the register.
        register: String,
        /// The requested direction.
        direction: Direction,
    },
}

/// The direction of a register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum Direction {
    /// readable
    Read,
    /// writable
    Write,
}

impl From<FieldOverflow> for Error {
    fn from(overflow: FieldOverflow) -> Self {
        Error::InvalidArgument(overflow.into())
    }
}
