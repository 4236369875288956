//! # Target identification and register access for ARM debug sessions
//!
//! chipmap works on top of an already opened debug session: a transport that has
//! enumerated the access ports of the chip, walked their ROM tables and found the
//! CPUs. From that, a [`Catalog`] identifies the chip and builds a [`Target`], which
//! knows the memory map and the peripheral registers of the chip and controls its
//! CPUs.
//!
//! # Examples
//!
//! ## Identifying the attached chip
//!
//! ```no_run
//! # fn open_session() -> chipmap::Session { unimplemented!() }
//! use chipmap::{Catalog, Identification};
//!
//! let session = open_session();
//!
//! match Catalog::builtin().identify(session)? {
//!     Identification::Identified(mut target) => {
//!         println!("Found {target}");
//!         target.halt(None)?;
//!     }
//!     Identification::NoTargetIdentified { mismatches, .. } => {
//!         for mismatch in mismatches {
//!             println!("Not a {}: {}", mismatch.variant, mismatch.reason);
//!         }
//!     }
//! }
//! # Ok::<(), chipmap::Error>(())
//! ```
//!
//! ## Reading a register field
//!
//! ```no_run
//! # fn identified_target() -> chipmap::Target { unimplemented!() }
//! let mut target = identified_target();
//!
//! target.enable_peripheral("TIM16")?;
//! let counting = target.device("TIM16")?.read_field("CR1", "CEN")?;
//! # Ok::<(), chipmap::Error>(())
//! ```
#![warn(missing_docs)]

pub mod architecture;
pub mod catalog;
pub mod config;
pub mod core;
pub mod device;
mod error;
pub mod probe;
mod session;
mod target;
pub mod vendor;

#[cfg(any(test, feature = "test"))]
pub mod test;

pub use crate::{
    catalog::{Catalog, Identification, TargetVariant},
    config::DeviceMap,
    core::CpuInterface,
    device::{Device, DeviceAccess},
    error::{Direction, Error, InvalidArgument},
    probe::{AccessError, DebugProbe},
    session::Session,
    target::{ChipIdentity, Target},
};

pub use chipmap_target::{
    DeviceDescription, DeviceKind, EnableBit, Field, FieldOverflow, LayoutError, RegisterAccess,
    RegisterArray, RegisterDescriptor,
};
