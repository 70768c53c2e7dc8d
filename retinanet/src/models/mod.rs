//! Model assembly.
//!
//! - `backbone`: backbone construction shared by the constructors
//! - `fpn`: the feature pyramid
//! - `head`: the dense classification and regression subnets
//! - `retinanet`: the single-stream model
//! - `dual`: the dual-stream model

pub mod backbone;
pub mod dual;
pub mod fpn;
pub mod head;
pub mod retinanet;

pub use backbone::{BackboneModifier, BuildOptions};
pub use dual::DualRetinaNet;
pub use fpn::{FeaturePyramid, FeaturePyramidConfig};
pub use head::{
    ClassificationHead, ClassificationHeadConfig, RegressionHead, RegressionHeadConfig,
};
pub use retinanet::{RetinaNet, RetinaNetOutput};
