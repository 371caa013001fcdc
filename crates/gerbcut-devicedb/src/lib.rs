pub mod error;
pub mod model;

pub use error::{DeviceError, DeviceResult};
pub use model::{
    find_by_name, is_supported, lookup, models, DeviceModel, Dialect, Quirks, DEVICE_TABLE,
    VENDOR_ID,
};
