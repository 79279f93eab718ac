//! Data types for the tracking subsystem.
//!
//! - [`geo`]: coordinates, position samples, resolved coordinates
//! - [`movement`]: movement records, parent orders, status and journey actions

pub mod geo;
pub mod movement;

pub use geo::*;
pub use movement::*;
