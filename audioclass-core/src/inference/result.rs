//! Classification output types.

use serde::{Deserialize, Serialize};

use crate::error::{AudioClassError, Result};

/// One scored class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Class index in the model's output vector.
    pub index: usize,
    /// Score in [0.0, 1.0].
    pub score: f32,
    /// Machine-readable class name.
    pub label: String,
    /// Human-readable name, if the label map carries one.
    pub display_name: Option<String>,
}

impl Category {
    pub fn new(index: usize, score: f32, label: impl Into<String>) -> Self {
        Self {
            index,
            score,
            label: label.into(),
            display_name: None,
        }
    }
}

/// Scored classes for one classification head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifications {
    pub head_index: usize,
    pub head_name: Option<String>,
    pub categories: Vec<Category>,
}

impl Classifications {
    /// Highest-scoring category. Ties go to the earlier entry.
    pub fn top(&self) -> Option<&Category> {
        self.categories
            .iter()
            .fold(None, |best: Option<&Category>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }
}

/// Result of classifying one window: one entry per model head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub heads: Vec<Classifications>,
}

impl ClassificationResult {
    /// Single-head result.
    pub fn single_head(categories: Vec<Category>) -> Self {
        Self {
            heads: vec![Classifications {
                head_index: 0,
                head_name: None,
                categories,
            }],
        }
    }

    /// Top category of the first head.
    pub fn top_category(&self) -> Option<&Category> {
        self.heads.first().and_then(Classifications::top)
    }

    /// Label of [`ClassificationResult::top_category`].
    pub fn top_label(&self) -> Option<&str> {
        self.top_category().map(|c| c.label.as_str())
    }

    /// Reject results with no heads or an empty first head.
    ///
    /// # Errors
    /// `Classify` when there is nothing to aggregate.
    pub fn ensure_non_empty(self) -> Result<Self> {
        match self.heads.first() {
            None => Err(AudioClassError::Classify(
                "classifier returned no heads".into(),
            )),
            Some(head) if head.categories.is_empty() => Err(AudioClassError::Classify(
                "classifier returned no categories".into(),
            )),
            Some(_) => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_label_picks_max_score_of_first_head() {
        let mut result = ClassificationResult::single_head(vec![
            Category::new(0, 0.1, "Speech"),
            Category::new(1, 0.7, "Music"),
            Category::new(2, 0.2, "Silence"),
        ]);
        result.heads.push(Classifications {
            head_index: 1,
            head_name: Some("aux".into()),
            categories: vec![Category::new(0, 0.99, "Dog")],
        });
        assert_eq!(result.top_label(), Some("Music"));
    }

    #[test]
    fn ties_keep_first() {
        let result = ClassificationResult::single_head(vec![
            Category::new(0, 0.5, "a"),
            Category::new(1, 0.5, "b"),
        ]);
        assert_eq!(result.top_label(), Some("a"));
    }

    #[test]
    fn empty_results_are_failures() {
        let no_heads = ClassificationResult { heads: vec![] };
        assert!(matches!(
            no_heads.ensure_non_empty(),
            Err(AudioClassError::Classify(_))
        ));
        let no_classes = ClassificationResult::single_head(vec![]);
        assert!(no_classes.ensure_non_empty().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let mut cat = Category::new(3, 0.25, "/m/09x0r");
        cat.display_name = Some("Speech".into());
        let json = serde_json::to_value(ClassificationResult::single_head(vec![cat])).unwrap();
        assert_eq!(json["heads"][0]["headIndex"], 0);
        assert_eq!(json["heads"][0]["categories"][0]["displayName"], "Speech");
    }
}
