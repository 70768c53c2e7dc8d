//! Download and verify the pretrained ImageNet weights for a backbone.
//!
//! ```bash
//! cargo run --features pretrained --bin fetch_weights -- resnet50
//! ```

use anyhow::Result;
use clap::Parser;
use retinanet_burn::{download_imagenet, BackboneVariant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backbone identifier (resnet50, resnet101 or resnet152)
    backbone: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let variant = BackboneVariant::from_name(&args.backbone)?;
    log::info!(
        "fetching {} (md5 {})",
        variant.weights().filename,
        variant.weights().md5
    );
    let path = download_imagenet(&variant)?;
    println!("{}", path.display());
    Ok(())
}
