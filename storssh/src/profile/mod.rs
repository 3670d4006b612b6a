//! Per-device-family configuration.
//!
//! A [`DeviceProfile`] tells the executor how to read a device's CLI: what
//! its prompt looks like, which banners are noise, and which response texts
//! mean "not supported" versus "failed". A [`StatusTable`] maps raw status
//! strings onto caller-defined values with an explicit fallback.

mod definition;
mod status;

pub use definition::DeviceProfile;
pub use status::StatusTable;
