use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use hf_hub::{Repo, RepoType, api::sync::Api};
use image::DynamicImage;
use serde::Deserialize;

use super::{CATEGORIES, Classification, SafetyClassifier, SafetyScores};

const DEFAULT_MODEL_REPO: &str = "safescan/safety-vit-base";
const MODEL_REPO_ENV: &str = "SAFESCAN_MODEL";
const IMAGE_SIZE: usize = 224;

// Class indices from the checkpoint config:
// 0: pornographic
// 1: dangerous
// 2: gory
const NUM_CLASSES: usize = 3;

/// Resolve the checkpoint repo id: `SAFESCAN_MODEL` env var, then the
/// built-in default.
pub fn model_repo() -> String {
    env::var(MODEL_REPO_ENV).unwrap_or_else(|_| DEFAULT_MODEL_REPO.to_string())
}

/// Pick the compute device once at startup: an accelerator when compiled in
/// and usable, CPU otherwise.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    if let Ok(device) = Device::new_cuda(0) {
        return device;
    }
    #[cfg(feature = "metal")]
    if let Ok(device) = Device::new_metal(0) {
        return device;
    }
    Device::Cpu
}

/// The slice of `config.json` this crate checks itself; the rest belongs to
/// the model architecture and is parsed separately as `vit::Config`.
#[derive(Debug, Deserialize)]
struct CheckpointConfig {
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
}

/// Reject checkpoints whose label table disagrees with the fixed category
/// order. A checkpoint without `id2label` is accepted as-is.
fn check_labels(raw_config: &str) -> Result<()> {
    let config: CheckpointConfig = serde_json::from_str(raw_config)?;
    let Some(id2label) = config.id2label else {
        return Ok(());
    };

    for (idx, expected) in CATEGORIES.iter().enumerate() {
        match id2label.get(&idx.to_string()) {
            Some(label) if label.eq_ignore_ascii_case(expected) => {}
            Some(label) => {
                return Err(anyhow!(
                    "checkpoint label mismatch at index {idx}: expected {expected}, config says {label}"
                ));
            }
            None => {
                return Err(anyhow!("checkpoint config has no label for index {idx}"));
            }
        }
    }

    Ok(())
}

/// Image-safety classifier backed by a ViT checkpoint with a three-way
/// safety head, fetched from the Hugging Face hub by repo id. Download and
/// caching are owned by hf-hub.
pub struct VitClassifier {
    model: vit::Model,
    device: Device,
}

impl VitClassifier {
    pub fn load(repo_id: &str, device: Device) -> Result<Self> {
        log::info!("Loading safety model {} on {:?}", repo_id, device);

        let api = Api::new()?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

        let model_path = repo.get("model.safetensors")?;
        let config_path = repo.get("config.json")?;

        let raw_config = fs::read_to_string(config_path)?;
        check_labels(&raw_config)?;

        let config: vit::Config = serde_json::from_str(&raw_config)?;
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[model_path], DType::F32, &device)? };
        let model = vit::Model::new(&config, NUM_CLASSES, vb)?;

        log::info!("Safety model loaded");

        Ok(Self { model, device })
    }
}

impl SafetyClassifier for VitClassifier {
    fn classify(&self, path: &Path) -> Result<Classification> {
        let img = match image::open(path) {
            Ok(img) => img,
            Err(err) => {
                return Ok(Classification::Undecodable {
                    reason: err.to_string(),
                });
            }
        };

        let input = preprocess(&img, &self.device)?;
        let logits = self.model.forward(&input)?;
        // One sigmoid per head: the categories are independent yes/no
        // judgments, not a 3-way softmax.
        let probs = candle_nn::ops::sigmoid(&logits)?;
        let probs: Vec<f32> = probs.flatten_all()?.to_vec1()?;

        if probs.len() != NUM_CLASSES {
            return Err(anyhow!(
                "expected {} category scores, model returned {}",
                NUM_CLASSES,
                probs.len()
            ));
        }

        Ok(Classification::Scored(SafetyScores {
            pornographic: probs[0],
            dangerous: probs[1],
            gory: probs[2],
        }))
    }
}

/// Resize to the model input size and normalize with the checkpoint's
/// processor constants (mean 0.5, std 0.5 on every channel), CHW layout,
/// batch of one.
fn preprocess(img: &DynamicImage, device: &Device) -> Result<Tensor> {
    let resized = img.resize_exact(
        IMAGE_SIZE as u32,
        IMAGE_SIZE as u32,
        image::imageops::FilterType::Triangle,
    );
    let rgb = resized.to_rgb8();

    let mean = 0.5;
    let std = 0.5;

    let mut data = vec![0f32; 3 * IMAGE_SIZE * IMAGE_SIZE];
    for (i, pixel) in rgb.pixels().enumerate() {
        let r = pixel[0] as f32 / 255.0;
        let g = pixel[1] as f32 / 255.0;
        let b = pixel[2] as f32 / 255.0;

        data[i] = (r - mean) / std;
        data[IMAGE_SIZE * IMAGE_SIZE + i] = (g - mean) / std;
        data[2 * IMAGE_SIZE * IMAGE_SIZE + i] = (b - mean) / std;
    }

    let tensor = Tensor::from_vec(data, (1, 3, IMAGE_SIZE, IMAGE_SIZE), device)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn preprocess_shapes_and_normalizes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([255, 0, 128])));
        let tensor = preprocess(&img, &Device::Cpu).expect("preprocess");
        assert_eq!(tensor.dims(), &[1, 3, IMAGE_SIZE, IMAGE_SIZE]);

        let values: Vec<f32> = tensor.flatten_all().unwrap().to_vec1().unwrap();
        // Solid-color input survives resizing untouched, so each channel is
        // one constant plane.
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        assert!((values[0] - 1.0).abs() < 1e-6); // 255 -> 1.0
        assert!((values[plane] + 1.0).abs() < 1e-6); // 0 -> -1.0
        assert!((values[2 * plane] - 0.00392).abs() < 1e-3); // 128 -> ~0.0
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn matching_label_table_is_accepted() {
        let raw = r#"{
            "hidden_size": 768,
            "id2label": {"0": "pornographic", "1": "dangerous", "2": "gory"}
        }"#;
        assert!(check_labels(raw).is_ok());
    }

    #[test]
    fn missing_label_table_is_accepted() {
        assert!(check_labels(r#"{"hidden_size": 768}"#).is_ok());
    }

    #[test]
    fn reordered_label_table_is_rejected() {
        let raw = r#"{"id2label": {"0": "gory", "1": "dangerous", "2": "pornographic"}}"#;
        let err = check_labels(raw).unwrap_err();
        assert!(err.to_string().contains("label mismatch"));
    }

    #[test]
    fn incomplete_label_table_is_rejected() {
        let raw = r#"{"id2label": {"0": "pornographic"}}"#;
        let err = check_labels(raw).unwrap_err();
        assert!(err.to_string().contains("no label for index 1"));
    }
}
