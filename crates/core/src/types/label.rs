//! Free-text label sets (allergies, avoided ingredients, tags).

/// Errors that can occur when normalizing a label set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// A label was empty after trimming.
    #[error("{field} cannot contain blank labels")]
    Blank {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Normalize a label set in place.
///
/// Each label is trimmed. Exact duplicates are collapsed, keeping the first
/// occurrence so client ordering is preserved.
///
/// # Errors
///
/// Returns `LabelError::Blank` if any label is empty after trimming.
///
/// # Example
///
/// ```
/// use mealplan_core::normalize_labels;
///
/// let labels = normalize_labels("tags", vec![" vegan".into(), "keto".into(), "vegan".into()]).unwrap();
/// assert_eq!(labels, vec!["vegan".to_string(), "keto".to_string()]);
/// ```
pub fn normalize_labels(
    field: &'static str,
    labels: Vec<String>,
) -> Result<Vec<String>, LabelError> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(LabelError::Blank { field });
        }
        if !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_owned());
        }
    }
    Ok(out)
}

/// Case-insensitive label comparison used by tag search.
#[must_use]
pub fn label_matches(label: &str, query: &str) -> bool {
    label.to_lowercase() == query.to_lowercase()
}
