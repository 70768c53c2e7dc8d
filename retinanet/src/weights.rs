//! Pretrained-weights handling: the resource registry, the download cache
//! and record loading.
//!
//! The registry pins one (filename, URL, MD5) triple per backbone variant.
//! Fetching and record loading live behind the `pretrained` feature.

#[cfg(feature = "pretrained")]
use std::path::PathBuf;
use std::path::Path;

use burn::prelude::*;
use resnet::ResNet;

use crate::error::{RetinaNetError, RetinaNetResult};

/// Identity of one downloadable pretrained-weights file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsResource {
    /// File name under the release, also the cache file name.
    pub filename: &'static str,
    /// Full download URL.
    pub url: &'static str,
    /// Hex-encoded MD5 digest of the file.
    pub md5: &'static str,
}

/// Release all weight files are published under.
pub const WEIGHTS_BASE_URL: &str =
    "https://github.com/fizyr/keras-models/releases/download/v0.0.1";

/// ImageNet weights for ResNet-50.
pub const RESNET50_WEIGHTS: WeightsResource = WeightsResource {
    filename: "ResNet-50-model.keras.h5",
    url: "https://github.com/fizyr/keras-models/releases/download/v0.0.1/ResNet-50-model.keras.h5",
    md5: "3e9f4e4f77bbe2c9bec13b53ee1c2319",
};

/// ImageNet weights for ResNet-101.
pub const RESNET101_WEIGHTS: WeightsResource = WeightsResource {
    filename: "ResNet-101-model.keras.h5",
    url: "https://github.com/fizyr/keras-models/releases/download/v0.0.1/ResNet-101-model.keras.h5",
    md5: "05dc86924389e5b401a9ea0348a3213c",
};

/// ImageNet weights for ResNet-152.
pub const RESNET152_WEIGHTS: WeightsResource = WeightsResource {
    filename: "ResNet-152-model.keras.h5",
    url: "https://github.com/fizyr/keras-models/releases/download/v0.0.1/ResNet-152-model.keras.h5",
    md5: "6ee11ef2b135592f8031058820bb9e71",
};

/// Download the ImageNet weights for a backbone variant and return the
/// local cache path.
///
/// A cached file with a matching digest is reused without touching the
/// network; a corrupt cached file is fetched again.
///
/// # Errors
///
/// [`RetinaNetError::DownloadFailed`] on network or filesystem failures,
/// [`RetinaNetError::ChecksumMismatch`] when the fetched bytes do not match
/// the published digest.
#[cfg(feature = "pretrained")]
pub fn download_imagenet(
    variant: &crate::config::BackboneVariant,
) -> RetinaNetResult<PathBuf> {
    fetch_cached(variant.weights(), "models")
}

#[cfg(feature = "pretrained")]
fn fetch_cached(resource: &WeightsResource, subdir: &str) -> RetinaNetResult<PathBuf> {
    use std::io::Read;

    let fs_err = |reason: std::io::Error| RetinaNetError::DownloadFailed {
        filename: resource.filename.to_owned(),
        reason: reason.to_string(),
    };

    let cache = dirs::cache_dir().ok_or_else(|| RetinaNetError::DownloadFailed {
        filename: resource.filename.to_owned(),
        reason: "no cache directory available on this platform".to_owned(),
    })?;
    let dir = cache.join("retinanet-burn").join(subdir);
    std::fs::create_dir_all(&dir).map_err(fs_err)?;
    let path = dir.join(resource.filename);

    if path.is_file() {
        let digest = format!("{:x}", md5::compute(std::fs::read(&path).map_err(fs_err)?));
        if digest == resource.md5 {
            return Ok(path);
        }
        log::warn!(
            "cached {} has digest {digest}, fetching again",
            resource.filename
        );
    }

    log::info!("downloading {} from {}", resource.filename, resource.url);
    let response = ureq::get(resource.url)
        .call()
        .map_err(|err| RetinaNetError::DownloadFailed {
            filename: resource.filename.to_owned(),
            reason: err.to_string(),
        })?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(fs_err)?;

    let digest = format!("{:x}", md5::compute(&bytes));
    if digest != resource.md5 {
        return Err(RetinaNetError::ChecksumMismatch {
            filename: resource.filename.to_owned(),
            expected: resource.md5.to_owned(),
            actual: digest,
        });
    }

    std::fs::write(&path, &bytes).map_err(fs_err)?;
    Ok(path)
}

/// Load pretrained weights into a backbone.
///
/// The record format is chosen by file extension: `.pt`/`.pth` (PyTorch),
/// `.safetensors`, or `.mpk` (named message-pack). A missing file always
/// fails. When `skip_mismatch` is set, a record that does not fit the
/// model's architecture is skipped with a warning and the freshly
/// initialized weights stay in place; otherwise the failure propagates.
///
/// # Errors
///
/// [`RetinaNetError::WeightLoadingFailed`] or
/// [`RetinaNetError::UnsupportedFormat`].
#[cfg(feature = "pretrained")]
pub fn load_backbone_weights<B: Backend>(
    model: ResNet<B>,
    path: &Path,
    skip_mismatch: bool,
    device: &Device<B>,
) -> RetinaNetResult<ResNet<B>> {
    if !path.is_file() {
        return Err(RetinaNetError::WeightLoadingFailed {
            reason: format!("weights file not found: {}", path.display()),
        });
    }

    match load_record(path, device) {
        Ok(record) => Ok(model.load_record(record)),
        Err(err @ RetinaNetError::UnsupportedFormat { .. }) => Err(err),
        Err(err) if skip_mismatch => {
            log::warn!("skipping weights that do not match the model: {err}");
            Ok(model)
        }
        Err(err) => Err(err),
    }
}

#[cfg(feature = "pretrained")]
fn load_record<B: Backend>(
    path: &Path,
    device: &Device<B>,
) -> RetinaNetResult<resnet::ResNetRecord<B>> {
    use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
    use burn_import::pytorch::{LoadArgs as PyTorchLoadArgs, PyTorchFileRecorder};
    use burn_import::safetensors::{LoadArgs as SafetensorsLoadArgs, SafetensorsFileRecorder};

    let loading_err = |err: burn::record::RecorderError| RetinaNetError::WeightLoadingFailed {
        reason: err.to_string(),
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "pt" | "pth" => PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(PyTorchLoadArgs::new(path.to_path_buf()), device)
            .map_err(loading_err),
        "safetensors" => SafetensorsFileRecorder::<FullPrecisionSettings>::default()
            .load(SafetensorsLoadArgs::new(path.to_path_buf()), device)
            .map_err(loading_err),
        "mpk" => NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(path.to_path_buf(), device)
            .map_err(loading_err),
        other => Err(RetinaNetError::UnsupportedFormat {
            format: other.to_owned(),
        }),
    }
}

/// Stub that reports the missing `pretrained` feature.
///
/// # Errors
///
/// Always returns [`RetinaNetError::WeightLoadingFailed`].
#[cfg(not(feature = "pretrained"))]
pub fn load_backbone_weights<B: Backend>(
    _model: ResNet<B>,
    path: &Path,
    _skip_mismatch: bool,
    _device: &Device<B>,
) -> RetinaNetResult<ResNet<B>> {
    Err(RetinaNetError::WeightLoadingFailed {
        reason: format!(
            "cannot load '{}': retinanet-burn was built without the `pretrained` feature",
            path.display()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&WeightsResource; 3] =
        [&RESNET50_WEIGHTS, &RESNET101_WEIGHTS, &RESNET152_WEIGHTS];

    #[test]
    fn resources_are_distinct() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.filename, b.filename);
                assert_ne!(a.md5, b.md5);
            }
        }
    }

    #[test]
    fn urls_point_into_the_release() {
        for resource in ALL {
            assert_eq!(
                resource.url,
                format!("{WEIGHTS_BASE_URL}/{}", resource.filename)
            );
            assert_eq!(resource.md5.len(), 32);
            assert!(resource.md5.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
