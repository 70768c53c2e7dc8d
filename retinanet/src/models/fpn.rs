//! Feature pyramid built on top of the trimmed backbone features.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Configuration for [`FeaturePyramid`].
#[derive(Config, Debug)]
pub struct FeaturePyramidConfig {
    /// Channel counts of the [c3, c4, c5] input features.
    pub in_channels: [usize; 3],
    /// Channel width of every pyramid level.
    #[config(default = "256")]
    pub feature_size: usize,
}

impl FeaturePyramidConfig {
    /// Initialize the pyramid on the given device.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> FeaturePyramid<B> {
        let [c3, c4, c5] = self.in_channels;

        let lateral = |in_channels: usize| {
            Conv2dConfig::new([in_channels, self.feature_size], [1, 1])
                .with_padding(PaddingConfig2d::Valid)
                .init(device)
        };
        let smooth = || {
            Conv2dConfig::new([self.feature_size, self.feature_size], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        FeaturePyramid {
            lateral_c3: lateral(c3),
            lateral_c4: lateral(c4),
            lateral_c5: lateral(c5),
            smooth_p3: smooth(),
            smooth_p4: smooth(),
            smooth_p5: smooth(),
            conv_p6: Conv2dConfig::new([c5, self.feature_size], [3, 3])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv_p7: Conv2dConfig::new([self.feature_size, self.feature_size], [3, 3])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            relu: Relu::new(),
        }
    }
}

/// The five-level feature pyramid of RetinaNet.
///
/// [c3, c4, c5] enter as lateral 1x1 reductions, the coarser levels are
/// upsampled (nearest) and added top-down, and each merged map is smoothed
/// with a 3x3 convolution. p6 is a strided convolution over c5, p7 a strided
/// convolution over the rectified p6.
#[derive(Module, Debug)]
pub struct FeaturePyramid<B: Backend> {
    lateral_c3: Conv2d<B>,
    lateral_c4: Conv2d<B>,
    lateral_c5: Conv2d<B>,
    smooth_p3: Conv2d<B>,
    smooth_p4: Conv2d<B>,
    smooth_p5: Conv2d<B>,
    conv_p6: Conv2d<B>,
    conv_p7: Conv2d<B>,
    relu: Relu,
}

impl<B: Backend> FeaturePyramid<B> {
    /// Build the pyramid levels [p3, p4, p5, p6, p7].
    pub fn forward(&self, features: [Tensor<B, 4>; 3]) -> [Tensor<B, 4>; 5] {
        let [c3, c4, c5] = features;

        let p5 = self.lateral_c5.forward(c5.clone());

        let [_, _, h4, w4] = c4.dims();
        let p4 = self.lateral_c4.forward(c4)
            + interpolate(
                p5.clone(),
                [h4, w4],
                InterpolateOptions::new(InterpolateMode::Nearest),
            );

        let [_, _, h3, w3] = c3.dims();
        let p3 = self.lateral_c3.forward(c3)
            + interpolate(
                p4.clone(),
                [h3, w3],
                InterpolateOptions::new(InterpolateMode::Nearest),
            );

        let p6 = self.conv_p6.forward(c5);
        let p7 = self.conv_p7.forward(self.relu.forward(p6.clone()));

        [
            self.smooth_p3.forward(p3),
            self.smooth_p4.forward(p4),
            self.smooth_p5.forward(p5),
            p6,
            p7,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn pyramid_levels_halve_in_resolution() {
        let device = Default::default();
        let fpn: FeaturePyramid<TestBackend> = FeaturePyramidConfig::new([512, 1024, 2048])
            .with_feature_size(256)
            .init(&device);

        let features = [
            Tensor::zeros([1, 512, 32, 32], &device),
            Tensor::zeros([1, 1024, 16, 16], &device),
            Tensor::zeros([1, 2048, 8, 8], &device),
        ];
        let [p3, p4, p5, p6, p7] = fpn.forward(features);

        assert_eq!(p3.dims(), [1, 256, 32, 32]);
        assert_eq!(p4.dims(), [1, 256, 16, 16]);
        assert_eq!(p5.dims(), [1, 256, 8, 8]);
        assert_eq!(p6.dims(), [1, 256, 4, 4]);
        assert_eq!(p7.dims(), [1, 256, 2, 2]);
    }
}
