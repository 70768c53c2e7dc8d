//! Detection subnets applied to every pyramid level.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

const TRUNK_DEPTH: usize = 4;

fn trunk<B: Backend>(feature_size: usize, device: &Device<B>) -> Vec<Conv2d<B>> {
    (0..TRUNK_DEPTH)
        .map(|_| {
            Conv2dConfig::new([feature_size, feature_size], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        })
        .collect()
}

/// Configuration for [`ClassificationHead`].
#[derive(Config, Debug)]
pub struct ClassificationHeadConfig {
    /// Number of object classes.
    pub num_classes: usize,
    /// Channel width of the pyramid levels and the trunk.
    #[config(default = "256")]
    pub feature_size: usize,
    /// Anchors predicted per spatial location.
    #[config(default = "9")]
    pub num_anchors: usize,
}

impl ClassificationHeadConfig {
    /// Initialize the head on the given device.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ClassificationHead<B> {
        ClassificationHead {
            convs: trunk(self.feature_size, device),
            output: Conv2dConfig::new(
                [self.feature_size, self.num_anchors * self.num_classes],
                [3, 3],
            )
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device),
            relu: Relu::new(),
            num_classes: self.num_classes,
            num_anchors: self.num_anchors,
        }
    }
}

/// Per-anchor class scores, shared across pyramid levels.
#[derive(Module, Debug)]
pub struct ClassificationHead<B: Backend> {
    convs: Vec<Conv2d<B>>,
    output: Conv2d<B>,
    relu: Relu,
    num_classes: usize,
    num_anchors: usize,
}

impl<B: Backend> ClassificationHead<B> {
    /// Scores for one level: `[batch, locations * anchors, num_classes]`.
    pub fn forward(&self, feature: Tensor<B, 4>) -> Tensor<B, 3> {
        let mut out = feature;
        for conv in &self.convs {
            out = self.relu.forward(conv.forward(out));
        }
        let logits = self.output.forward(out);
        let [batch, _, height, width] = logits.dims();

        sigmoid(logits).permute([0, 2, 3, 1]).reshape([
            batch,
            height * width * self.num_anchors,
            self.num_classes,
        ])
    }

    /// Scores for all levels, concatenated along the anchor dimension.
    pub fn forward_levels(&self, levels: &[Tensor<B, 4>]) -> Tensor<B, 3> {
        let per_level = levels
            .iter()
            .map(|level| self.forward(level.clone()))
            .collect();
        Tensor::cat(per_level, 1)
    }
}

/// Configuration for [`RegressionHead`].
#[derive(Config, Debug)]
pub struct RegressionHeadConfig {
    /// Channel width of the pyramid levels and the trunk.
    #[config(default = "256")]
    pub feature_size: usize,
    /// Anchors predicted per spatial location.
    #[config(default = "9")]
    pub num_anchors: usize,
}

impl RegressionHeadConfig {
    /// Initialize the head on the given device.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> RegressionHead<B> {
        RegressionHead {
            convs: trunk(self.feature_size, device),
            output: Conv2dConfig::new([self.feature_size, self.num_anchors * 4], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            relu: Relu::new(),
            num_anchors: self.num_anchors,
        }
    }
}

/// Per-anchor box regression deltas, shared across pyramid levels.
#[derive(Module, Debug)]
pub struct RegressionHead<B: Backend> {
    convs: Vec<Conv2d<B>>,
    output: Conv2d<B>,
    relu: Relu,
    num_anchors: usize,
}

impl<B: Backend> RegressionHead<B> {
    /// Deltas for one level: `[batch, locations * anchors, 4]`.
    pub fn forward(&self, feature: Tensor<B, 4>) -> Tensor<B, 3> {
        let mut out = feature;
        for conv in &self.convs {
            out = self.relu.forward(conv.forward(out));
        }
        let deltas = self.output.forward(out);
        let [batch, _, height, width] = deltas.dims();

        deltas
            .permute([0, 2, 3, 1])
            .reshape([batch, height * width * self.num_anchors, 4])
    }

    /// Deltas for all levels, concatenated along the anchor dimension.
    pub fn forward_levels(&self, levels: &[Tensor<B, 4>]) -> Tensor<B, 3> {
        let per_level = levels
            .iter()
            .map(|level| self.forward(level.clone()))
            .collect();
        Tensor::cat(per_level, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn classification_scores_are_probabilities() {
        let device = Default::default();
        let head: ClassificationHead<TestBackend> = ClassificationHeadConfig::new(7)
            .with_feature_size(32)
            .with_num_anchors(9)
            .init(&device);

        let level = Tensor::random(
            [2, 32, 4, 4],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let scores = head.forward(level);

        assert_eq!(scores.dims(), [2, 4 * 4 * 9, 7]);
        let values: Vec<f32> = scores.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn regression_concatenates_levels() {
        let device = Default::default();
        let head: RegressionHead<TestBackend> = RegressionHeadConfig::new()
            .with_feature_size(32)
            .with_num_anchors(9)
            .init(&device);

        let levels = [
            Tensor::zeros([1, 32, 4, 4], &device),
            Tensor::zeros([1, 32, 2, 2], &device),
        ];
        let deltas = head.forward_levels(&levels);

        assert_eq!(deltas.dims(), [1, (16 + 4) * 9, 4]);
    }
}
