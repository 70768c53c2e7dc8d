//! RetinaNet object detection models with ResNet backbones, built on Burn.
//!
//! The crate selects a backbone variant by name, constructs it through the
//! `resnet` crate with its classification head disabled and normalization
//! layers frozen, optionally loads pretrained weights, and assembles the
//! detection model: a feature pyramid over the backbone features plus dense
//! classification and regression heads. A dual-stream variant runs two
//! independent backbone instances over separate input streams.

mod config;
mod error;
mod models;
mod preprocessing;
mod weights;

#[cfg(test)]
mod tests;

pub use config::*;
pub use error::{RetinaNetError, RetinaNetResult};
pub use models::{
    BackboneModifier, BuildOptions, ClassificationHead, ClassificationHeadConfig, DualRetinaNet,
    FeaturePyramid, FeaturePyramidConfig, RegressionHead, RegressionHeadConfig, RetinaNet,
    RetinaNetOutput,
};
pub use preprocessing::preprocess_image;
#[cfg(feature = "pretrained")]
pub use weights::download_imagenet;
pub use weights::{
    load_backbone_weights, WeightsResource, RESNET101_WEIGHTS, RESNET152_WEIGHTS,
    RESNET50_WEIGHTS, WEIGHTS_BASE_URL,
};
