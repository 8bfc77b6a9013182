use anyhow::Result;
use std::fmt;
use std::path::Path;

/// Category names in score order. Every vector view of the scores and every
/// verdict listing uses this order.
pub const CATEGORIES: [&str; 3] = ["pornographic", "dangerous", "gory"];

/// Per-category safety probabilities for one image, each in [0, 1].
///
/// The categories are independent judgments (one sigmoid per head), so they
/// do not sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyScores {
    pub pornographic: f32,
    pub dangerous: f32,
    pub gory: f32,
}

impl SafetyScores {
    /// The scores in fixed category order, matching [`CATEGORIES`].
    pub fn as_array(&self) -> [f32; 3] {
        [self.pornographic, self.dangerous, self.gory]
    }
}

impl fmt::Display for SafetyScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}]",
            self.pornographic, self.dangerous, self.gory
        )
    }
}

/// Outcome of classifying one file.
///
/// A file that cannot be decoded as an image is a value, not an error: the
/// scan skips it and keeps going, and callers must handle the branch.
#[derive(Debug)]
pub enum Classification {
    Scored(SafetyScores),
    Undecodable { reason: String },
}

/// Pluggable image-safety classifier.
pub trait SafetyClassifier {
    /// Classify the image at `path`.
    ///
    /// Decode problems come back as `Ok(Classification::Undecodable { .. })`;
    /// `Err` is reserved for infrastructure failures (device, inference) that
    /// should end the scan.
    fn classify(&self, path: &Path) -> Result<Classification>;
}

mod vit;

pub use vit::{VitClassifier, model_repo, select_device};
