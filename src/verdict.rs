//! Fixed-threshold mapping from safety scores to a human-readable label.

use crate::classifier::{CATEGORIES, SafetyScores};

/// A category is reported only when its probability strictly exceeds this.
const UNSAFE_THRESHOLD: f32 = 0.5;

/// Derive the verdict for one image: `"Safe"`, or the triggered categories
/// in fixed order inside the `"May contain: .. material"` template.
///
/// Pure function; exactly 0.5 does not trigger.
pub fn verdict(scores: &SafetyScores) -> String {
    let mut flagged = Vec::new();
    for (name, score) in CATEGORIES.iter().zip(scores.as_array()) {
        if score > UNSAFE_THRESHOLD {
            flagged.push(*name);
        }
    }

    if flagged.is_empty() {
        "Safe".to_string()
    } else {
        format!("May contain: {} material", flagged.join(", "))
    }
}
