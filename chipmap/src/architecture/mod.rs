//! Architecture specific support.

pub mod arm;
