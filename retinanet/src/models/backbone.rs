//! Backbone construction shared by the model constructors.

use std::path::PathBuf;

use burn::prelude::*;
use resnet::ResNet;

use crate::config::{BackboneVariant, ImageLayout};
use crate::error::{RetinaNetError, RetinaNetResult};
use crate::weights::load_backbone_weights;

/// A caller-supplied transform from backbone to backbone.
///
/// Applied exactly once per constructed backbone instance; the return value
/// replaces the instance (freezing a subset of layers is the typical use).
pub type BackboneModifier<'a, B> = dyn Fn(ResNet<B>) -> ResNet<B> + 'a;

/// Optional arguments threaded through one model build call.
pub struct BuildOptions<'a, B: Backend> {
    /// Transform applied to every backbone instance.
    pub modifier: Option<&'a BackboneModifier<'a, B>>,
    /// Pretrained weights loaded into every backbone instance.
    pub weights: Option<PathBuf>,
    /// Skip weights that do not fit the model instead of failing.
    pub skip_mismatch: bool,
}

impl<B: Backend> Default for BuildOptions<'_, B> {
    fn default() -> Self {
        Self {
            modifier: None,
            weights: None,
            skip_mismatch: true,
        }
    }
}

impl<'a, B: Backend> BuildOptions<'a, B> {
    /// Set the backbone transform.
    pub fn with_modifier(mut self, modifier: &'a BackboneModifier<'a, B>) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Set the pretrained weights path.
    pub fn with_weights(mut self, weights: PathBuf) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set whether mismatched weights are skipped.
    pub fn with_skip_mismatch(mut self, skip_mismatch: bool) -> Self {
        self.skip_mismatch = skip_mismatch;
        self
    }
}

/// Build one backbone instance: construct for the variant and channel depth,
/// apply the modifier, then load weights when supplied.
pub(crate) fn build_backbone<B: Backend>(
    variant: &BackboneVariant,
    input_channels: usize,
    options: &BuildOptions<'_, B>,
    device: &Device<B>,
) -> RetinaNetResult<ResNet<B>> {
    let mut backbone = variant.backbone_config(input_channels).init(device);

    if let Some(modifier) = options.modifier {
        backbone = modifier(backbone);
    }

    if let Some(path) = &options.weights {
        log::info!("loading backbone weights from {}", path.display());
        backbone = load_backbone_weights(backbone, path, options.skip_mismatch, device)?;
    }

    Ok(backbone)
}

/// Check an input stream against its descriptor and bring it into the
/// channels-first order the backbone expects.
pub(crate) fn to_channels_first<B: Backend>(
    images: Tensor<B, 4>,
    channels: usize,
    layout: &ImageLayout,
) -> RetinaNetResult<Tensor<B, 4>> {
    let dims = images.dims();
    let axis = layout.channel_axis();
    if dims[axis] != channels {
        return Err(RetinaNetError::InvalidTensorShape {
            expected: format!("{channels} channels on axis {axis}"),
            actual: format!("{dims:?}"),
        });
    }

    Ok(match layout {
        ImageLayout::ChannelsFirst => images,
        ImageLayout::ChannelsLast => images.permute([0, 3, 1, 2]),
    })
}
