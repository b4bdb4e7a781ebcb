//! HTTP request handlers for the maintenance API.
//!
//! This module is organized by domain:
//! - `common` - Response envelope and error mapping
//! - `maintenance` - Window CRUD, early end and extension
//! - `status` - Device maintenance status

pub mod common;
pub mod maintenance;
pub mod status;

pub use maintenance::*;
pub use status::*;
