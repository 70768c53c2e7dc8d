//! Configuration module for the RetinaNet models.
//!
//! - `core`: the main configuration structures
//! - `enums`: enumeration types used in configurations

pub mod core;
pub mod enums;

pub use core::{DualRetinaNetConfig, HeadConfig, InputConfig, RetinaNetConfig};

pub use enums::{BackboneVariant, ImageLayout, PreprocessingMode};
