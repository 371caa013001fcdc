//! Error types for the device database crate.

use thiserror::Error;

/// Errors that can occur while resolving a cutter model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The vendor/product pair is not in the device table.
    #[error("Unsupported device {vendor_id:#06x}:{product_id:#06x}")]
    UnknownProduct { vendor_id: u16, product_id: u16 },

    /// No model with this name exists.
    #[error("Unknown cutter model: {0}")]
    UnknownModel(String),
}

/// Result type alias for device lookups.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::UnknownProduct {
            vendor_id: 0x0b4d,
            product_id: 0x9999,
        };
        assert_eq!(err.to_string(), "Unsupported device 0x0b4d:0x9999");

        let err = DeviceError::UnknownModel("Cameo 9".to_string());
        assert_eq!(err.to_string(), "Unknown cutter model: Cameo 9");
    }
}
