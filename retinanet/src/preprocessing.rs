//! Image preprocessing for network input.

use burn::prelude::*;

use crate::config::{ImageLayout, PreprocessingMode};
use crate::error::{RetinaNetError, RetinaNetResult};

/// ImageNet channel means, BGR order.
const IMAGENET_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Prepare a batch of images for the network.
///
/// * `Caffe` — reorder RGB to BGR and subtract the ImageNet channel means;
///   the input must carry three channels.
/// * `Tf` — scale pixel values from [0, 255] to [-1, 1]; any channel depth.
///
/// The channel axis is taken from `layout`; spatial dimensions are left
/// untouched.
///
/// # Errors
///
/// Returns [`RetinaNetError::InvalidTensorShape`] when `Caffe` mode is
/// requested for a non-3-channel input.
pub fn preprocess_image<B: Backend>(
    input: Tensor<B, 4>,
    mode: &PreprocessingMode,
    layout: &ImageLayout,
) -> RetinaNetResult<Tensor<B, 4>> {
    match mode {
        PreprocessingMode::Tf => Ok(input / 127.5 - 1.0),
        PreprocessingMode::Caffe => {
            let axis = layout.channel_axis();
            let dims = input.dims();
            if dims[axis] != 3 {
                return Err(RetinaNetError::InvalidTensorShape {
                    expected: "3 channels".to_owned(),
                    actual: format!("{} channels", dims[axis]),
                });
            }

            let device = input.device();

            // RGB -> BGR
            let reversed = Tensor::<B, 1, Int>::from_ints([2, 1, 0], &device);
            let bgr = input.select(axis, reversed);

            let mean_shape = match layout {
                ImageLayout::ChannelsFirst => [1, 3, 1, 1],
                ImageLayout::ChannelsLast => [1, 1, 1, 3],
            };
            let mean =
                Tensor::<B, 1>::from_floats(IMAGENET_MEAN_BGR, &device).reshape(mean_shape);

            Ok(bgr - mean)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn caffe_flips_channels_and_subtracts_means() {
        let device = Default::default();
        // One pixel, channels R=10, G=20, B=30
        let input = Tensor::<TestBackend, 4>::from_floats([[[[10.0]], [[20.0]], [[30.0]]]], &device);

        let out = preprocess_image(
            input,
            &PreprocessingMode::Caffe,
            &ImageLayout::ChannelsFirst,
        )
        .unwrap();

        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        // BGR order minus [103.939, 116.779, 123.68]
        assert!((values[0] - (30.0 - 103.939)).abs() < 1e-4);
        assert!((values[1] - (20.0 - 116.779)).abs() < 1e-4);
        assert!((values[2] - (10.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn caffe_rejects_non_rgb_inputs() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);

        let result = preprocess_image(
            input,
            &PreprocessingMode::Caffe,
            &ImageLayout::ChannelsFirst,
        );

        assert!(matches!(
            result,
            Err(RetinaNetError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn tf_scales_into_unit_range() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 255.0]]]], &device);

        let out = preprocess_image(input, &PreprocessingMode::Tf, &ImageLayout::ChannelsFirst)
            .unwrap();

        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        assert!((values[0] + 1.0).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn caffe_handles_channels_last() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::from_floats([[[[10.0, 20.0, 30.0]]]], &device);

        let out = preprocess_image(
            input,
            &PreprocessingMode::Caffe,
            &ImageLayout::ChannelsLast,
        )
        .unwrap();

        assert_eq!(out.dims(), [1, 1, 1, 3]);
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        assert!((values[0] - (30.0 - 103.939)).abs() < 1e-4);
    }
}
