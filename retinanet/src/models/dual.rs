//! The dual-stream RetinaNet model.
//!
//! Two structurally identical backbone instances process independent input
//! streams. The streams live in separate module subtrees (`backbone_a` /
//! `backbone_b`), so their parameter paths never collide; per level, the two
//! feature maps are concatenated along the channel axis before the shared
//! pyramid and heads run.

use burn::{module::Ignored, prelude::*};
use resnet::ResNet;

use super::backbone::{build_backbone, to_channels_first, BuildOptions};
use super::fpn::{FeaturePyramid, FeaturePyramidConfig};
use super::head::{
    ClassificationHead, ClassificationHeadConfig, RegressionHead, RegressionHeadConfig,
};
use super::retinanet::RetinaNetOutput;
use crate::config::{DualRetinaNetConfig, ImageLayout};
use crate::error::{RetinaNetError, RetinaNetResult};

impl DualRetinaNetConfig {
    /// Initialize a dual-stream RetinaNet model with default build options.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> RetinaNetResult<DualRetinaNet<B>> {
        self.init_with(&BuildOptions::default(), device)
    }

    /// Initialize a dual-stream RetinaNet model.
    ///
    /// Each stream gets its own backbone instance of the configured variant;
    /// the modifier is applied to each instance independently (twice
    /// overall) and the same weights file is loaded into each instance
    /// independently with identical skip-mismatch semantics.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or weight loading
    /// fails.
    pub fn init_with<B: Backend>(
        &self,
        options: &BuildOptions<'_, B>,
        device: &Device<B>,
    ) -> RetinaNetResult<DualRetinaNet<B>> {
        self.validate()?;

        let backbone_a = build_backbone(&self.backbone, self.input_a.channels, options, device)?;
        let backbone_b = build_backbone(&self.backbone, self.input_b.channels, options, device)?;

        // Stage channels are depth-dependent only, so both streams share
        // them; the per-level concat doubles the pyramid input widths.
        let [_, c3, c4, c5] = self
            .backbone
            .backbone_config(self.input_a.channels)
            .output_channels();
        let fpn = FeaturePyramidConfig::new([c3 * 2, c4 * 2, c5 * 2])
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

        Ok(DualRetinaNet {
            backbone_a,
            backbone_b,
            fpn,
            classification,
            regression,
            layout_a: Ignored(self.input_a.layout.clone()),
            layout_b: Ignored(self.input_b.layout.clone()),
            input_channels_a: self.input_a.channels,
            input_channels_b: self.input_b.channels,
        })
    }
}

/// Dual-stream RetinaNet: two backbones, one pyramid, two dense heads.
#[derive(Module, Debug)]
pub struct DualRetinaNet<B: Backend> {
    backbone_a: ResNet<B>,
    backbone_b: ResNet<B>,
    fpn: FeaturePyramid<B>,
    classification: ClassificationHead<B>,
    regression: RegressionHead<B>,
    layout_a: Ignored<ImageLayout>,
    layout_b: Ignored<ImageLayout>,
    input_channels_a: usize,
    input_channels_b: usize,
}

impl<B: Backend> DualRetinaNet<B> {
    /// Forward pass over one batch per stream.
    ///
    /// Both batches must share their spatial dimensions; channel depths are
    /// validated per stream.
    ///
    /// # Errors
    ///
    /// Returns an error when either input does not match its descriptor or
    /// the spatial dimensions differ across streams.
    pub fn forward(
        &self,
        images_a: Tensor<B, 4>,
        images_b: Tensor<B, 4>,
    ) -> RetinaNetResult<RetinaNetOutput<B>> {
        let images_a = to_channels_first(images_a, self.input_channels_a, &self.layout_a)?;
        let images_b = to_channels_first(images_b, self.input_channels_b, &self.layout_b)?;

        let [_, _, h_a, w_a] = images_a.dims();
        let [_, _, h_b, w_b] = images_b.dims();
        if (h_a, w_a) != (h_b, w_b) {
            return Err(RetinaNetError::InvalidTensorShape {
                expected: format!("matching spatial dimensions ({h_a}x{w_a})"),
                actual: format!("{h_b}x{w_b}"),
            });
        }

        let [_, a3, a4, a5] = self.backbone_a.forward(images_a);
        let [_, b3, b4, b5] = self.backbone_b.forward(images_b);

        let merged = [
            Tensor::cat(vec![a3, b3], 1),
            Tensor::cat(vec![a4, b4], 1),
            Tensor::cat(vec![a5, b5], 1),
        ];
        let levels = self.fpn.forward(merged);

        Ok(RetinaNetOutput {
            regression: self.regression.forward_levels(&levels),
            classification: self.classification.forward_levels(&levels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use burn::backend::NdArray;
    use core::cell::Cell;

    type TestBackend = NdArray<f32>;

    fn dual_config() -> DualRetinaNetConfig {
        DualRetinaNetConfig::new(5)
            .with_input_a(InputConfig::new().with_channels(3))
            .with_input_b(InputConfig::new().with_channels(1))
    }

    #[test]
    fn streams_carry_independent_channel_depths() {
        let device = Default::default();
        let model: DualRetinaNet<TestBackend> = dual_config().init(&device).unwrap();

        let rgb = Tensor::zeros([1, 3, 64, 64], &device);
        let thermal = Tensor::zeros([1, 1, 64, 64], &device);
        let output = model.forward(rgb, thermal).unwrap();

        let anchors = (64 + 16 + 4 + 1 + 1) * 9;
        assert_eq!(output.classification.dims(), [1, anchors, 5]);
        assert_eq!(output.regression.dims(), [1, anchors, 4]);
    }

    #[test]
    fn swapped_streams_are_rejected() {
        let device = Default::default();
        let model: DualRetinaNet<TestBackend> = dual_config().init(&device).unwrap();

        let rgb = Tensor::zeros([1, 3, 64, 64], &device);
        let thermal = Tensor::zeros([1, 1, 64, 64], &device);
        assert!(matches!(
            model.forward(thermal, rgb),
            Err(RetinaNetError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn modifier_runs_once_per_stream() {
        let device = Default::default();
        let calls = Cell::new(0_usize);
        let modifier = |backbone: ResNet<TestBackend>| -> ResNet<TestBackend> {
            calls.set(calls.get() + 1);
            backbone
        };

        let options = BuildOptions::<TestBackend>::default().with_modifier(&modifier);
        let _model = dual_config().init_with(&options, &device).unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn stream_parameters_live_in_disjoint_subtrees() {
        let device = Default::default();
        let model: DualRetinaNet<TestBackend> = dual_config().init(&device).unwrap();

        let rendered = format!("{model}");
        assert!(rendered.contains("backbone_a"));
        assert!(rendered.contains("backbone_b"));
    }

    #[test]
    fn invalid_backbone_fails_before_building() {
        assert!(DualRetinaNetConfig::from_backbone_name("vgg16", 5).is_err());
    }
}
