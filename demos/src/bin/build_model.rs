//! Build a RetinaNet model and run a forward pass over a random batch.
//!
//! ## Usage
//!
//! ```bash
//! # Single-stream model with a ResNet-50 backbone
//! cargo run --bin build_model -- resnet50 --num-classes 80
//!
//! # Dual-stream model with an RGB and a single-channel stream
//! cargo run --bin build_model -- resnet101 --num-classes 10 --dual --channels-b 1
//!
//! # Load pretrained backbone weights
//! cargo run --features pretrained --bin build_model -- resnet50 --weights backbone.safetensors
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::NdArray;
use burn::tensor::Tensor;
use clap::Parser;
use retinanet_burn::{
    BuildOptions, DualRetinaNetConfig, InputConfig, RetinaNetConfig, RetinaNetOutput,
};

type Backend = NdArray<f32>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backbone identifier (resnet50, resnet101 or resnet152)
    backbone: String,

    /// Number of object classes
    #[arg(short, long, default_value = "80")]
    num_classes: usize,

    /// Channel depth of the input stream
    #[arg(long, default_value = "3")]
    channels: usize,

    /// Build the dual-stream model
    #[arg(long)]
    dual: bool,

    /// Channel depth of the second stream (dual-stream only)
    #[arg(long, default_value = "3")]
    channels_b: usize,

    /// Spatial size of the random test batch
    #[arg(long, default_value = "256")]
    image_size: usize,

    /// Pretrained backbone weights to load
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Fail on weights that do not fit instead of skipping them
    #[arg(long)]
    strict_weights: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let device = Default::default();
    let mut options =
        BuildOptions::<Backend>::default().with_skip_mismatch(!args.strict_weights);
    if let Some(weights) = args.weights.clone() {
        options = options.with_weights(weights);
    }

    let size = args.image_size;
    let output = if args.dual {
        let config = DualRetinaNetConfig::from_backbone_name(&args.backbone, args.num_classes)?
            .with_input_a(InputConfig::new().with_channels(args.channels))
            .with_input_b(InputConfig::new().with_channels(args.channels_b));
        let model = config
            .init_with(&options, &device)
            .context("build dual-stream model")?;

        let images_a = Tensor::<Backend, 4>::zeros([1, args.channels, size, size], &device);
        let images_b = Tensor::<Backend, 4>::zeros([1, args.channels_b, size, size], &device);
        model.forward(images_a, images_b)?
    } else {
        let config = RetinaNetConfig::from_backbone_name(&args.backbone, args.num_classes)?
            .with_input(InputConfig::new().with_channels(args.channels));
        let model = config
            .init_with(&options, &device)
            .context("build single-stream model")?;

        let images = Tensor::<Backend, 4>::zeros([1, args.channels, size, size], &device);
        model.forward(images)?
    };

    report(&args.backbone, &output);
    Ok(())
}

fn report(backbone: &str, output: &RetinaNetOutput<Backend>) {
    let [_, anchors, classes] = output.classification.dims();
    println!("{backbone}: {anchors} anchors, {classes} classes");
    println!("classification: {:?}", output.classification.dims());
    println!("regression:     {:?}", output.regression.dims());
}
