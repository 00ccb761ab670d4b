//! Format drivers
//!
//! Each submodule implements [`crate::driver::SonarDriver`] for one family
//! of on-disk formats.
pub mod lidar;
pub mod sb2100;
