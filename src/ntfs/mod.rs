//! NTFS volume handling: discovery, health, mounting, unmounting,
//! persistence and status.
pub mod device;
pub mod driver;
pub mod health;
pub mod mount;
pub mod mounts;
pub mod persist;
pub mod sanitize;
pub mod status;
pub mod unmount;
pub mod usage;
