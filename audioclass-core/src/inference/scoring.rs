//! Turning raw model score tensors into ranked categories.

use serde::{Deserialize, Serialize};

use super::labels::LabelMap;
use super::result::Category;

/// Post-processing applied to a score vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOptions {
    /// Keep at most this many categories (highest first).
    pub max_results: Option<usize>,
    /// Drop categories scoring below this value.
    pub score_threshold: Option<f32>,
}

/// Average a row-major `[frames, classes]` score matrix over frames.
///
/// Models that emit one score row per internal patch (YAMNet emits one per
/// 0.48 s hop) are reduced to a single row per window this way.
pub fn mean_over_frames(data: &[f32], n_classes: usize) -> Vec<f32> {
    if n_classes == 0 || data.is_empty() {
        return Vec::new();
    }
    let frames = data.len() / n_classes;
    if frames == 0 {
        return Vec::new();
    }
    let mut mean = vec![0f32; n_classes];
    for row in data.chunks_exact(n_classes) {
        for (acc, v) in mean.iter_mut().zip(row) {
            *acc += v;
        }
    }
    for v in &mut mean {
        *v /= frames as f32;
    }
    mean
}

/// Rank `scores` highest first, attach labels, then apply `options`.
pub fn rank(scores: &[f32], labels: &LabelMap, options: ScoreOptions) -> Vec<Category> {
    let mut categories: Vec<Category> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| options.score_threshold.map_or(true, |t| **s >= t))
        .map(|(index, &score)| Category {
            index,
            score,
            label: labels.name_or_index(index),
            display_name: labels.get(index).and_then(|e| e.display_name.clone()),
        })
        .collect();

    // Stable sort keeps lower class indices first on equal scores.
    categories.sort_by(|a, b| b.score.total_cmp(&a.score));

    if let Some(max) = options.max_results {
        categories.truncate(max);
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_two_frames() {
        let mean = mean_over_frames(&[0.0, 1.0, 0.5, 0.5], 2);
        assert_relative_eq!(mean[0], 0.25);
        assert_relative_eq!(mean[1], 0.75);
    }

    #[test]
    fn mean_of_degenerate_input_is_empty() {
        assert!(mean_over_frames(&[], 3).is_empty());
        assert!(mean_over_frames(&[1.0], 0).is_empty());
    }

    #[test]
    fn rank_orders_and_limits() {
        let labels = LabelMap::parse("a\nb\nc\n").unwrap();
        let options = ScoreOptions {
            max_results: Some(2),
            score_threshold: Some(0.2),
        };
        let ranked = rank(&[0.3, 0.1, 0.6], &labels, options);
        let names: Vec<_> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(ranked[0].index, 2);
    }

    #[test]
    fn threshold_can_empty_the_result() {
        let labels = LabelMap::default();
        let options = ScoreOptions {
            max_results: None,
            score_threshold: Some(0.9),
        };
        assert!(rank(&[0.1, 0.2], &labels, options).is_empty());
    }

    #[test]
    fn missing_labels_fall_back_to_index() {
        let ranked = rank(&[0.4], &LabelMap::default(), ScoreOptions::default());
        assert_eq!(ranked[0].label, "class_0");
    }
}
