//! The single-stream RetinaNet model.

use burn::{module::Ignored, prelude::*};
use resnet::ResNet;

use super::backbone::{build_backbone, to_channels_first, BuildOptions};
use super::fpn::{FeaturePyramid, FeaturePyramidConfig};
use super::head::{
    ClassificationHead, ClassificationHeadConfig, RegressionHead, RegressionHeadConfig,
};
use crate::config::{ImageLayout, RetinaNetConfig};
use crate::error::RetinaNetResult;

/// Dense per-anchor outputs of the detection heads.
#[derive(Debug, Clone)]
pub struct RetinaNetOutput<B: Backend> {
    /// Box regression deltas, `[batch, anchors, 4]`.
    pub regression: Tensor<B, 3>,
    /// Class scores, `[batch, anchors, num_classes]`.
    pub classification: Tensor<B, 3>,
}

impl RetinaNetConfig {
    /// Initialize a RetinaNet model with default build options.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> RetinaNetResult<RetinaNet<B>> {
        self.init_with(&BuildOptions::default(), device)
    }

    /// Initialize a RetinaNet model.
    ///
    /// Validation runs before anything is constructed. The backbone is built
    /// for the configured variant and channel depth with its classification
    /// head disabled and normalization layers frozen, transformed by the
    /// modifier when one is supplied, and filled from the weights file when
    /// one is supplied. All backbone features but the earliest stage feed
    /// the feature pyramid.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or weight loading
    /// fails.
    pub fn init_with<B: Backend>(
        &self,
        options: &BuildOptions<'_, B>,
        device: &Device<B>,
    ) -> RetinaNetResult<RetinaNet<B>> {
        self.validate()?;

        let backbone = build_backbone(&self.backbone, self.input.channels, options, device)?;

        let [_, c3, c4, c5] = self
            .backbone
            .backbone_config(self.input.channels)
            .output_channels();
        let fpn = FeaturePyramidConfig::new([c3, c4, c5])
            .with_feature_size(self.head.feature_size)
            .init(device);

        let classification = ClassificationHeadConfig::new(self.num_classes)
            .with_feature_size(self.head.feature_size)
            .with_num_anchors(self.head.num_anchors)
            .init(device);
        let regression = RegressionHeadConfig::new()
            .with_feature_size(self.head.feature_size)
            .with_num_anchors(self.head.num_anchors)
            .init(device);

        Ok(RetinaNet {
            backbone,
            fpn,
            classification,
            regression,
            layout: Ignored(self.input.layout.clone()),
            input_channels: self.input.channels,
        })
    }
}

/// RetinaNet: one backbone, a feature pyramid and two dense heads.
#[derive(Module, Debug)]
pub struct RetinaNet<B: Backend> {
    backbone: ResNet<B>,
    fpn: FeaturePyramid<B>,
    classification: ClassificationHead<B>,
    regression: RegressionHead<B>,
    layout: Ignored<ImageLayout>,
    input_channels: usize,
}

impl<B: Backend> RetinaNet<B> {
    /// Forward pass over one batch of images.
    ///
    /// The backbone produces four feature maps; all but the first feed the
    /// pyramid, and both heads run over every pyramid level.
    ///
    /// # Errors
    ///
    /// Returns an error when the input does not match the configured
    /// channel depth and layout.
    pub fn forward(&self, images: Tensor<B, 4>) -> RetinaNetResult<RetinaNetOutput<B>> {
        let images = to_channels_first(images, self.input_channels, &self.layout)?;

        let [_c2, c3, c4, c5] = self.backbone.forward(images);
        let levels = self.fpn.forward([c3, c4, c5]);

        Ok(RetinaNetOutput {
            regression: self.regression.forward_levels(&levels),
            classification: self.classification.forward_levels(&levels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackboneVariant, InputConfig};
    use crate::error::RetinaNetError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn anchors_for(sizes: &[usize], num_anchors: usize) -> usize {
        sizes.iter().map(|s| s * s * num_anchors).sum()
    }

    #[test]
    fn resnet50_retinanet_forward_shapes() {
        let device = Default::default();
        let model: RetinaNet<TestBackend> = RetinaNetConfig::resnet50(10)
            .init(&device)
            .unwrap();

        let images = Tensor::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = model.forward(images).unwrap();

        // Pyramid levels for a 64x64 input: 8, 4, 2, 1, 1 per side.
        let anchors = anchors_for(&[8, 4, 2, 1, 1], 9);
        assert_eq!(output.classification.dims(), [1, anchors, 10]);
        assert_eq!(output.regression.dims(), [1, anchors, 4]);
    }

    #[test]
    fn invalid_backbone_fails_before_building() {
        let result = RetinaNetConfig::from_backbone_name("resnet34", 10);
        assert!(matches!(
            result,
            Err(RetinaNetError::InvalidBackbone { .. })
        ));
    }

    #[test]
    fn zero_classes_is_rejected() {
        let device = Default::default();
        let result: RetinaNetResult<RetinaNet<TestBackend>> =
            RetinaNetConfig::new(0).init(&device);
        assert!(matches!(
            result,
            Err(RetinaNetError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn modifier_runs_once_and_replaces_the_backbone() {
        use core::cell::Cell;

        let device = Default::default();
        let calls = Cell::new(0_usize);
        let modifier = |backbone: ResNet<TestBackend>| -> ResNet<TestBackend> {
            calls.set(calls.get() + 1);
            backbone
        };

        let options = BuildOptions::<TestBackend>::default().with_modifier(&modifier);
        let _model = RetinaNetConfig::resnet50(2)
            .init_with(&options, &device)
            .unwrap();

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn channels_last_inputs_are_accepted() {
        let device = Default::default();
        let config = RetinaNetConfig::resnet50(2).with_input(
            InputConfig::new()
                .with_channels(3)
                .with_layout(ImageLayout::ChannelsLast),
        );
        let model: RetinaNet<TestBackend> = config.init(&device).unwrap();

        let images = Tensor::zeros([1, 32, 32, 3], &device);
        assert!(model.forward(images).is_ok());

        let wrong = Tensor::zeros([1, 3, 32, 32], &device);
        assert!(matches!(
            model.forward(wrong),
            Err(RetinaNetError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn variant_names_round_trip() {
        for name in ["resnet50", "resnet101", "resnet152"] {
            let variant = BackboneVariant::from_name(name).unwrap();
            assert_eq!(variant.name(), name);
        }
    }
}
