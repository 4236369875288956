//! All the interface bits for ARM.

pub mod ap;
pub mod component;

pub use ap::{AccessPort, AccessPortKind};
pub use component::{Component, ComponentClass, ComponentIter, ComponentKind, PeripheralId};
