use crate::error::{DeviceError, DeviceResult};
use serde::{Deserialize, Serialize};

/// USB vendor id shared by every supported cutter.
pub const VENDOR_ID: u16 = 0x0B4D;

/// Model-specific commands sent around the cut body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// Feed the media out after the job (`FO0`)
    pub media_feed_out: bool,
    /// Return the carriage home after the job (`H`)
    pub return_home: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            media_feed_out: true,
            return_home: true,
        }
    }
}

/// Command dialect a model speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Device steps per inch
    pub steps_per_inch: u32,
    /// Byte ending every command
    pub terminator: u8,
    /// Coordinates are sent y first
    pub swap_axes: bool,
    pub quirks: Quirks,
}

impl Dialect {
    /// GP-GL as spoken by the Silhouette and Craft ROBO family
    pub const GPGL: Dialect = Dialect {
        steps_per_inch: 508,
        terminator: 0x03,
        swap_axes: true,
        quirks: Quirks {
            media_feed_out: true,
            return_home: true,
        },
    };

    /// Length of one device step in inches
    pub fn step(&self) -> f64 {
        1.0 / self.steps_per_inch as f64
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::GPGL
    }
}

/// One row of the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceModel {
    pub name: &'static str,
    pub product_id: u16,
    pub dialect: Dialect,
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#06x}:{:#06x})", self.name, VENDOR_ID, self.product_id)
    }
}

const fn gpgl(name: &'static str, product_id: u16) -> DeviceModel {
    DeviceModel {
        name,
        product_id,
        dialect: Dialect::GPGL,
    }
}

/// Every cutter the engine will open, in enumeration priority order.
pub static DEVICE_TABLE: &[DeviceModel] = &[
    gpgl("Craft ROBO CC200-20", 0x110A),
    gpgl("Craft ROBO CC300-20", 0x111A),
    gpgl("Silhouette SD 1", 0x111C),
    gpgl("Silhouette SD 2", 0x111D),
    gpgl("Silhouette Cameo", 0x1121),
    gpgl("Silhouette Portrait", 0x1123),
    gpgl("Silhouette Cameo 2", 0x112B),
    gpgl("Silhouette Cameo 3", 0x112F),
    gpgl("Silhouette Portrait 2", 0x1132),
    gpgl("Silhouette Cameo 4", 0x1137),
    gpgl("Silhouette Portrait 3", 0x113A),
];

/// All supported models
pub fn models() -> &'static [DeviceModel] {
    DEVICE_TABLE
}

/// Whether a USB id pair belongs to a supported cutter
pub fn is_supported(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == VENDOR_ID && DEVICE_TABLE.iter().any(|m| m.product_id == product_id)
}

/// Resolve a USB id pair to its model
pub fn lookup(vendor_id: u16, product_id: u16) -> DeviceResult<&'static DeviceModel> {
    if vendor_id != VENDOR_ID {
        return Err(DeviceError::UnknownProduct {
            vendor_id,
            product_id,
        });
    }
    DEVICE_TABLE
        .iter()
        .find(|m| m.product_id == product_id)
        .ok_or(DeviceError::UnknownProduct {
            vendor_id,
            product_id,
        })
}

/// Find a model by name, ignoring case
pub fn find_by_name(name: &str) -> DeviceResult<&'static DeviceModel> {
    DEVICE_TABLE
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            tracing::debug!("No cutter model named {:?}", name);
            DeviceError::UnknownModel(name.to_string())
        })
}
