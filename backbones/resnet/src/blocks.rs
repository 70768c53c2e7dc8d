//! Residual building blocks shared by the ResNet variants.

use core::f64::consts::SQRT_2;

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Initializer, PaddingConfig2d, Relu,
    },
    prelude::*,
};

fn kaiming() -> Initializer {
    Initializer::KaimingNormal {
        gain: SQRT_2,
        fan_out_only: true,
    }
}

/// Batch norm, optionally taken out of gradient tracking so neither its
/// affine parameters nor its running statistics move during training.
fn norm<B: Backend>(channels: usize, freeze: bool, device: &Device<B>) -> BatchNorm<B, 2> {
    let bn = BatchNormConfig::new(channels).init(device);
    if freeze {
        bn.no_grad()
    } else {
        bn
    }
}

#[derive(Module, Debug)]
pub enum ResidualBlock<B: Backend> {
    Bottleneck(Bottleneck<B>),
    Basic(BasicBlock<B>),
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Basic(block) => block.forward(input),
            Self::Bottleneck(block) => block.forward(input),
        }
    }
}

/// Two 3x3 convolutions with a skip connection (ResNet-18/34).
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = input.clone();

        let out = self.conv1.forward(input);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);

        let out = match &self.downsample {
            Some(downsample) => out + downsample.forward(identity),
            None => out + identity,
        };

        self.relu.forward(out)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        freeze_norm: bool,
        device: &Device<B>,
    ) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn1 = norm(out_channels, freeze_norm, device);

        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn2 = norm(out_channels, freeze_norm, device);

        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, freeze_norm, device));

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            conv2,
            bn2,
            downsample,
        }
    }
}

/// 1x1 / 3x3 / 1x1 bottleneck with expansion 4 (ResNet-50/101/152).
///
/// **NOTE:** The downsampling stride sits on the 3x3 convolution rather than
/// the first 1x1 as in the original paper; this is the common V1.5 variant.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = input.clone();

        let out = self.conv1.forward(input);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv3.forward(out);
        let out = self.bn3.forward(out);

        let out = match &self.downsample {
            Some(downsample) => out + downsample.forward(identity),
            None => out + identity,
        };

        self.relu.forward(out)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        freeze_norm: bool,
        device: &Device<B>,
    ) -> Self {
        // Intermediate channels with expansion 4
        let int_out_channels = out_channels / 4;

        let conv1 = Conv2dConfig::new([in_channels, int_out_channels], [1, 1])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(0, 0))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn1 = norm(int_out_channels, freeze_norm, device);

        let conv2 = Conv2dConfig::new([int_out_channels, int_out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn2 = norm(int_out_channels, freeze_norm, device);

        let conv3 = Conv2dConfig::new([int_out_channels, out_channels], [1, 1])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(0, 0))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn3 = norm(out_channels, freeze_norm, device);

        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, freeze_norm, device));

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            conv2,
            bn2,
            conv3,
            bn3,
            downsample,
        }
    }
}

/// 1x1 projection that matches the skip connection to the block output.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(input);
        self.bn.forward(out)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        freeze_norm: bool,
        device: &Device<B>,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(0, 0))
            .with_bias(false)
            .with_initializer(kaiming())
            .init(device);
        let bn = norm(out_channels, freeze_norm, device);

        Self { conv, bn }
    }
}

/// One ResNet stage: a run of residual blocks where only the first block
/// carries the stride.
#[derive(Module, Debug)]
pub struct LayerBlock<B: Backend> {
    blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> LayerBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut out = input;
        for block in &self.blocks {
            out = block.forward(out);
        }
        out
    }

    pub fn new(
        num_blocks: usize,
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        bottleneck: bool,
        freeze_norm: bool,
        device: &Device<B>,
    ) -> Self {
        let blocks = (0..num_blocks)
            .map(|b| {
                let (ins, stride) = if b == 0 {
                    (in_channels, stride)
                } else {
                    (out_channels, 1)
                };
                if bottleneck {
                    ResidualBlock::Bottleneck(Bottleneck::new(
                        ins,
                        out_channels,
                        stride,
                        freeze_norm,
                        device,
                    ))
                } else {
                    ResidualBlock::Basic(BasicBlock::new(
                        ins,
                        out_channels,
                        stride,
                        freeze_norm,
                        device,
                    ))
                }
            })
            .collect();

        Self { blocks }
    }
}
