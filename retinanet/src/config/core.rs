//! Core configuration structures for the RetinaNet models.

use burn::prelude::*;

use super::enums::{BackboneVariant, ImageLayout};
use crate::error::{RetinaNetError, RetinaNetResult};

/// Descriptor of one input image stream.
///
/// Only the channel depth and the layout convention are fixed; spatial
/// dimensions stay dynamic and are taken from the tensors at forward time.
#[derive(Config, Debug)]
pub struct InputConfig {
    /// Channel depth of the stream.
    #[config(default = "3")]
    pub channels: usize,
    /// Tensor-layout convention of the stream.
    #[config(default = "ImageLayout::ChannelsFirst")]
    pub layout: ImageLayout,
}

/// Pass-through configuration for the detection head builder.
#[derive(Config, Debug)]
pub struct HeadConfig {
    /// Channel width of the feature pyramid and the head trunks.
    #[config(default = "256")]
    pub feature_size: usize,
    /// Anchors predicted per spatial location.
    #[config(default = "9")]
    pub num_anchors: usize,
}

/// Configuration for the single-stream RetinaNet model.
#[derive(Config, Debug)]
pub struct RetinaNetConfig {
    /// Number of object classes to predict.
    pub num_classes: usize,
    /// The backbone network variant.
    #[config(default = "BackboneVariant::Resnet50")]
    pub backbone: BackboneVariant,
    /// The input stream descriptor.
    #[config(default = "InputConfig::new()")]
    pub input: InputConfig,
    /// Detection head configuration.
    #[config(default = "HeadConfig::new()")]
    pub head: HeadConfig,
}

impl RetinaNetConfig {
    /// RetinaNet with a ResNet-50 backbone.
    pub fn resnet50(num_classes: usize) -> Self {
        Self::new(num_classes).with_backbone(BackboneVariant::Resnet50)
    }

    /// RetinaNet with a ResNet-101 backbone.
    pub fn resnet101(num_classes: usize) -> Self {
        Self::new(num_classes).with_backbone(BackboneVariant::Resnet101)
    }

    /// RetinaNet with a ResNet-152 backbone.
    pub fn resnet152(num_classes: usize) -> Self {
        Self::new(num_classes).with_backbone(BackboneVariant::Resnet152)
    }

    /// Build a configuration from a backbone identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`RetinaNetError::InvalidBackbone`] for identifiers outside
    /// the allowed set.
    pub fn from_backbone_name(name: &str, num_classes: usize) -> RetinaNetResult<Self> {
        Ok(Self::new(num_classes).with_backbone(BackboneVariant::from_name(name)?))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RetinaNetError::InvalidConfiguration`] when a field is
    /// logically inconsistent.
    pub fn validate(&self) -> RetinaNetResult<()> {
        if self.num_classes == 0 {
            return Err(RetinaNetError::InvalidConfiguration {
                reason: "num_classes must be positive".to_owned(),
            });
        }
        validate_input("input", &self.input)?;
        validate_head(&self.head)
    }
}

/// Configuration for the dual-stream RetinaNet model.
///
/// Both streams run the same backbone variant but carry independent input
/// descriptors, so the channel depths may differ per stream.
#[derive(Config, Debug)]
pub struct DualRetinaNetConfig {
    /// Number of object classes to predict.
    pub num_classes: usize,
    /// The backbone network variant, instantiated once per stream.
    #[config(default = "BackboneVariant::Resnet50")]
    pub backbone: BackboneVariant,
    /// Descriptor of the first input stream.
    #[config(default = "InputConfig::new()")]
    pub input_a: InputConfig,
    /// Descriptor of the second input stream.
    #[config(default = "InputConfig::new()")]
    pub input_b: InputConfig,
    /// Detection head configuration.
    #[config(default = "HeadConfig::new()")]
    pub head: HeadConfig,
}

impl DualRetinaNetConfig {
    /// Build a configuration from a backbone identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`RetinaNetError::InvalidBackbone`] for identifiers outside
    /// the allowed set.
    pub fn from_backbone_name(name: &str, num_classes: usize) -> RetinaNetResult<Self> {
        Ok(Self::new(num_classes).with_backbone(BackboneVariant::from_name(name)?))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RetinaNetError::InvalidConfiguration`] when a field is
    /// logically inconsistent.
    pub fn validate(&self) -> RetinaNetResult<()> {
        if self.num_classes == 0 {
            return Err(RetinaNetError::InvalidConfiguration {
                reason: "num_classes must be positive".to_owned(),
            });
        }
        validate_input("input_a", &self.input_a)?;
        validate_input("input_b", &self.input_b)?;
        validate_head(&self.head)
    }
}

fn validate_input(stream: &str, input: &InputConfig) -> RetinaNetResult<()> {
    if input.channels == 0 {
        return Err(RetinaNetError::InvalidConfiguration {
            reason: format!("{stream}: channel depth must be positive"),
        });
    }
    Ok(())
}

fn validate_head(head: &HeadConfig) -> RetinaNetResult<()> {
    if head.feature_size == 0 {
        return Err(RetinaNetError::InvalidConfiguration {
            reason: "head feature_size must be positive".to_owned(),
        });
    }
    if head.num_anchors == 0 {
        return Err(RetinaNetError::InvalidConfiguration {
            reason: "head num_anchors must be positive".to_owned(),
        });
    }
    Ok(())
}
