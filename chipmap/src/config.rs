//! Device maps: additional devices described in YAML.
//!
//! ```yaml
//! devices:
//!   - name: TIM16
//!     base_address: 0x40014400
//!     registers:
//!       - name: CR1
//!         offset: 0x0
//!         fields:
//!           - { name: CEN, width: 1, shift: 0 }
//!       - name: EGR
//!         offset: 0x14
//!         access: w
//! ```

use crate::Error;
use chipmap_target::DeviceDescription;
use serde::{Deserialize, Serialize};

/// A list of device descriptions, attached to a target with
/// [`Target::add_devices`](crate::Target::add_devices).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceMap {
    /// The devices, in the order they are added.
    pub devices: Vec<DeviceDescription>,
}

impl DeviceMap {
    /// Parses a device map from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads a device map from a YAML document.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        Ok(serde_yaml::from_reader(reader)?)
    }
}
