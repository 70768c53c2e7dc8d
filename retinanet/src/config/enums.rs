//! Enumeration types for RetinaNet configuration.

use burn::prelude::*;

use crate::error::{RetinaNetError, RetinaNetResult};
use crate::weights::WeightsResource;
use resnet::ResNetConfig;

/// The supported backbone networks.
///
/// A closed set: each variant maps through a fixed table to its depth, its
/// builder and its pretrained-weights resource.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum BackboneVariant {
    /// ResNet-50.
    Resnet50,
    /// ResNet-101.
    Resnet101,
    /// ResNet-152.
    Resnet152,
}

/// One row per supported backbone: identifier, depth, weights resource.
const VARIANTS: [(&str, usize, BackboneVariant); 3] = [
    ("resnet50", 50, BackboneVariant::Resnet50),
    ("resnet101", 101, BackboneVariant::Resnet101),
    ("resnet152", 152, BackboneVariant::Resnet152),
];

impl BackboneVariant {
    /// Parse a backbone identifier.
    ///
    /// An optional suffix after the first underscore is ignored, so
    /// `"resnet50_quantized"` selects the same variant as `"resnet50"`.
    ///
    /// # Errors
    ///
    /// Returns [`RetinaNetError::InvalidBackbone`] for identifiers outside
    /// the allowed set.
    pub fn from_name(name: &str) -> RetinaNetResult<Self> {
        let stem = name.split('_').next().unwrap_or_default();

        VARIANTS
            .iter()
            .find(|(id, _, _)| *id == stem)
            .map(|(_, _, variant)| variant.clone())
            .ok_or_else(|| RetinaNetError::InvalidBackbone {
                name: name.to_owned(),
                allowed: VARIANTS
                    .iter()
                    .map(|(id, _, _)| *id)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// The canonical identifier of this variant.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Resnet50 => "resnet50",
            Self::Resnet101 => "resnet101",
            Self::Resnet152 => "resnet152",
        }
    }

    /// The layer depth of this variant.
    pub const fn depth(&self) -> usize {
        match self {
            Self::Resnet50 => 50,
            Self::Resnet101 => 101,
            Self::Resnet152 => 152,
        }
    }

    /// The pretrained ImageNet weights resource for this variant.
    pub const fn weights(&self) -> &'static WeightsResource {
        match self {
            Self::Resnet50 => &crate::weights::RESNET50_WEIGHTS,
            Self::Resnet101 => &crate::weights::RESNET101_WEIGHTS,
            Self::Resnet152 => &crate::weights::RESNET152_WEIGHTS,
        }
    }

    /// The image preprocessing mode expected by this backbone family.
    pub const fn preprocessing_mode(&self) -> PreprocessingMode {
        PreprocessingMode::Caffe
    }

    /// Backbone builder configuration: classification head disabled,
    /// normalization layers frozen.
    pub fn backbone_config(&self, input_channels: usize) -> ResNetConfig {
        let config = match self {
            Self::Resnet50 => ResNetConfig::resnet50(),
            Self::Resnet101 => ResNetConfig::resnet101(),
            Self::Resnet152 => ResNetConfig::resnet152(),
        };
        config
            .with_in_channels(input_channels)
            .with_num_classes(None)
            .with_freeze_norm(true)
    }
}

/// The tensor-layout convention of input images.
///
/// Passed explicitly into the constructors; never read from global state.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum ImageLayout {
    /// `[batch, channels, height, width]`.
    ChannelsFirst,
    /// `[batch, height, width, channels]`.
    ChannelsLast,
}

impl ImageLayout {
    /// Index of the channel axis in a 4-dimensional image tensor.
    pub const fn channel_axis(&self) -> usize {
        match self {
            Self::ChannelsFirst => 1,
            Self::ChannelsLast => 3,
        }
    }
}

/// Image preprocessing modes.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum PreprocessingMode {
    /// BGR channel order with ImageNet mean subtraction.
    Caffe,
    /// Scale pixel values to [-1, 1].
    Tf,
}
