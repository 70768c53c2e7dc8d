//! ResNet models for retinanet-burn.
//!
//! Bottleneck and basic-block ResNet variants built with Burn, exposing the
//! ordered multi-scale feature maps that detection heads consume. The layer
//! layout follows the torchvision ResNet family.

use core::f64::consts::SQRT_2;

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, Initializer, Linear, LinearConfig, PaddingConfig2d, Relu,
};
use burn::prelude::*;

mod blocks;
pub use blocks::*;

// Residual block counts per stage
const RESNET18_BLOCKS: [usize; 4] = [2, 2, 2, 2];
const RESNET34_BLOCKS: [usize; 4] = [3, 4, 6, 3];
const RESNET50_BLOCKS: [usize; 4] = [3, 4, 6, 3];
const RESNET101_BLOCKS: [usize; 4] = [3, 4, 23, 3];
const RESNET152_BLOCKS: [usize; 4] = [3, 8, 36, 3];

const STAGE_CHANNELS: [usize; 4] = [64, 128, 256, 512];

/// ResNet configuration.
///
/// The named constructors cover the standard depths; `num_classes: None`
/// builds a feature-extraction backbone without the classification head.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Number of residual blocks in each of the four stages.
    pub blocks: [usize; 4],
    /// Use bottleneck blocks (expansion 4) instead of basic blocks.
    #[config(default = "true")]
    pub bottleneck: bool,
    /// Channel depth of the input images.
    #[config(default = "3")]
    pub in_channels: usize,
    /// Classes for the classification head; `None` leaves the head out.
    #[config(default = "None")]
    pub num_classes: Option<usize>,
    /// Keep batch-normalization layers out of gradient tracking.
    #[config(default = "false")]
    pub freeze_norm: bool,
}

impl ResNetConfig {
    /// ResNet-18 configuration.
    pub fn resnet18() -> Self {
        Self::new(RESNET18_BLOCKS).with_bottleneck(false)
    }

    /// ResNet-34 configuration.
    pub fn resnet34() -> Self {
        Self::new(RESNET34_BLOCKS).with_bottleneck(false)
    }

    /// ResNet-50 configuration.
    pub fn resnet50() -> Self {
        Self::new(RESNET50_BLOCKS)
    }

    /// ResNet-101 configuration.
    pub fn resnet101() -> Self {
        Self::new(RESNET101_BLOCKS)
    }

    /// ResNet-152 configuration.
    pub fn resnet152() -> Self {
        Self::new(RESNET152_BLOCKS)
    }

    const fn expansion(&self) -> usize {
        if self.bottleneck {
            4
        } else {
            1
        }
    }

    /// Channel counts of the four feature maps `forward` returns.
    pub fn output_channels(&self) -> [usize; 4] {
        STAGE_CHANNELS.map(|c| c * self.expansion())
    }

    /// Initialize the model on the given device.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ResNet<B> {
        let expansion = self.expansion();
        let stem = Stem::new(self.in_channels, STAGE_CHANNELS[0], self.freeze_norm, device);

        let layer1 = LayerBlock::new(
            self.blocks[0],
            STAGE_CHANNELS[0],
            STAGE_CHANNELS[0] * expansion,
            1,
            self.bottleneck,
            self.freeze_norm,
            device,
        );
        let layer2 = LayerBlock::new(
            self.blocks[1],
            STAGE_CHANNELS[0] * expansion,
            STAGE_CHANNELS[1] * expansion,
            2,
            self.bottleneck,
            self.freeze_norm,
            device,
        );
        let layer3 = LayerBlock::new(
            self.blocks[2],
            STAGE_CHANNELS[1] * expansion,
            STAGE_CHANNELS[2] * expansion,
            2,
            self.bottleneck,
            self.freeze_norm,
            device,
        );
        let layer4 = LayerBlock::new(
            self.blocks[3],
            STAGE_CHANNELS[2] * expansion,
            STAGE_CHANNELS[3] * expansion,
            2,
            self.bottleneck,
            self.freeze_norm,
            device,
        );

        let head = self
            .num_classes
            .map(|classes| ClassifierHead::new(STAGE_CHANNELS[3] * expansion, classes, device));

        ResNet {
            stem,
            layer1,
            layer2,
            layer3,
            layer4,
            head,
        }
    }
}

/// A ResNet model.
///
/// `forward` yields the four stage outputs [c2, c3, c4, c5] at strides
/// 4/8/16/32 relative to the input.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem: Stem<B>,
    layer1: LayerBlock<B>,
    layer2: LayerBlock<B>,
    layer3: LayerBlock<B>,
    layer4: LayerBlock<B>,
    head: Option<ClassifierHead<B>>,
}

impl<B: Backend> ResNet<B> {
    /// Forward pass returning the four multi-scale feature maps.
    pub fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 4] {
        let c2 = self.layer1.forward(self.stem.forward(input));
        let c3 = self.layer2.forward(c2.clone());
        let c4 = self.layer3.forward(c3.clone());
        let c5 = self.layer4.forward(c4.clone());

        [c2, c3, c4, c5]
    }

    /// Class logits, or `None` when the model was built without a head.
    pub fn forward_classify(&self, input: Tensor<B, 4>) -> Option<Tensor<B, 2>> {
        let head = self.head.as_ref()?;
        let [_, _, _, c5] = self.forward(input);
        Some(head.forward(c5))
    }
}

/// Stem: 7x7/2 convolution, batch norm, ReLU and a 3x3/2 max-pool.
#[derive(Module, Debug)]
pub struct Stem<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    maxpool: MaxPool2d,
}

impl<B: Backend> Stem<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(input);
        let out = self.bn.forward(out);
        let out = self.relu.forward(out);
        self.maxpool.forward(out)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        freeze_norm: bool,
        device: &Device<B>,
    ) -> Self {
        let initializer = Initializer::KaimingNormal {
            gain: SQRT_2,
            fan_out_only: true,
        };

        let conv = Conv2dConfig::new([in_channels, out_channels], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .with_initializer(initializer)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);
        let bn = if freeze_norm { bn.no_grad() } else { bn };

        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            maxpool,
        }
    }
}

/// Global average pool followed by a linear classifier.
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pool: AdaptiveAvgPool2d,
    fc: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let pooled = self.pool.forward(input);
        self.fc.forward(pooled.flatten(1, 3))
    }

    pub fn new(in_channels: usize, num_classes: usize, device: &Device<B>) -> Self {
        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(in_channels, num_classes).init(device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn named_configs_match_reference_depths() {
        assert_eq!(ResNetConfig::resnet50().blocks, [3, 4, 6, 3]);
        assert_eq!(ResNetConfig::resnet101().blocks, [3, 4, 23, 3]);
        assert_eq!(ResNetConfig::resnet152().blocks, [3, 8, 36, 3]);
        assert_eq!(
            ResNetConfig::resnet50().output_channels(),
            [256, 512, 1024, 2048]
        );
        assert_eq!(
            ResNetConfig::resnet18().output_channels(),
            [64, 128, 256, 512]
        );
    }

    #[test]
    fn resnet50_forward_shapes() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNetConfig::resnet50().init(&device);

        let input = Tensor::random(
            [1, 3, 224, 224],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let [c2, c3, c4, c5] = model.forward(input);

        assert_eq!(c2.dims(), [1, 256, 56, 56]);
        assert_eq!(c3.dims(), [1, 512, 28, 28]);
        assert_eq!(c4.dims(), [1, 1024, 14, 14]);
        assert_eq!(c5.dims(), [1, 2048, 7, 7]);
    }

    #[test]
    fn custom_input_depth_is_honored() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNetConfig::resnet18().with_in_channels(1).init(&device);

        let input = Tensor::random(
            [2, 1, 64, 64],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let [c2, _, _, c5] = model.forward(input);

        assert_eq!(c2.dims(), [2, 64, 16, 16]);
        assert_eq!(c5.dims(), [2, 512, 2, 2]);
    }

    #[test]
    fn classifier_head_is_optional() {
        let device = Default::default();
        let backbone: ResNet<TestBackend> = ResNetConfig::resnet18().init(&device);
        let classifier: ResNet<TestBackend> = ResNetConfig::resnet18()
            .with_num_classes(Some(10))
            .init(&device);

        let input = Tensor::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        assert!(backbone.forward_classify(input.clone()).is_none());
        let logits = classifier.forward_classify(input).unwrap();
        assert_eq!(logits.dims(), [1, 10]);
    }
}
