//! Register and device description schema
//!
//! chipmap turns the handful of identification registers behind the access ports of
//! an ARM debug session into a typed map of the peripherals of the attached chip.
//! The peripherals are described by static data: registers at an offset from a base
//! address, with named bit fields and access rights.
//!
//! This crate contains that data model. Every type can be built in a `const` context,
//! which is how the built-in chip tables are written, and deserialized from YAML,
//! which is how additional devices are described at runtime.
//!
#![warn(missing_docs)]

mod block;
mod clock;
mod device;
mod field;
mod register;
pub(crate) mod serialize;

pub use block::RegisterArray;
pub use clock::EnableBit;
pub use device::{DeviceDescription, DeviceKind};
pub use field::{Field, FieldOverflow};
pub use register::{LayoutError, RegisterAccess, RegisterDescriptor};
