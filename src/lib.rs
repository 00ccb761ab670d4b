#![warn(missing_docs)]
//! A toolkit for reading and writing swath sonar and lidar data
//!
//! Each on-disk format is handled by a driver behind the
//! [`driver::SonarDriver`] trait. [`reader::PingReader`] filters and
//! averages the pings a driver decodes, and [`writer::PingWriter`] encodes
//! generic records back out. [`platform`] describes where sensors sit on a
//! vessel and moves positions between them.
pub mod cli;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod format;
pub mod geodesy;
pub mod model;
pub mod platform;
pub mod reader;
pub mod writer;

pub use error::{Error, Result};
