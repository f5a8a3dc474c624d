use serde::{Deserialize, Serialize};

use crate::anchors::Anchor;
use crate::CoreError;

pub const MIN_RADIUS_METERS: u32 = 1;
pub const MAX_RADIUS_METERS: u32 = 100_000;
pub const MIN_TARGET_COUNT: usize = 20;
pub const MAX_TARGET_COUNT: usize = 1000;

/// One text search against one anchor.
///
/// Built through [`SearchQuery::new`], which enforces the radius and target
/// bounds, so the cursor driver can trust any instance it receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub anchor: Anchor,
    pub radius_meters: u32,
    pub category: Option<String>,
    pub target_count: usize,
}

impl SearchQuery {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuery`] if `text` is blank, `radius_meters`
    /// is outside `[1, 100000]` or `target_count` is outside `[20, 1000]`.
    pub fn new(
        text: &str,
        anchor: Anchor,
        radius_meters: u32,
        category: Option<&str>,
        target_count: usize,
    ) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::InvalidQuery("search text is empty".to_owned()));
        }
        if !(MIN_RADIUS_METERS..=MAX_RADIUS_METERS).contains(&radius_meters) {
            return Err(CoreError::InvalidQuery(format!(
                "radius {radius_meters}m outside [{MIN_RADIUS_METERS}, {MAX_RADIUS_METERS}]"
            )));
        }
        if !(MIN_TARGET_COUNT..=MAX_TARGET_COUNT).contains(&target_count) {
            return Err(CoreError::InvalidQuery(format!(
                "target count {target_count} outside [{MIN_TARGET_COUNT}, {MAX_TARGET_COUNT}]"
            )));
        }

        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        Ok(Self {
            text: text.to_owned(),
            anchor,
            radius_meters,
            category,
            target_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> Anchor {
        Anchor::from_pin(53.5, 10.0).unwrap()
    }

    #[test]
    fn accepts_bounds_inclusive() {
        assert!(SearchQuery::new("bakery", anchor(), 1, None, 20).is_ok());
        assert!(SearchQuery::new("bakery", anchor(), 100_000, None, 1000).is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_radius_and_target() {
        assert!(SearchQuery::new("bakery", anchor(), 0, None, 20).is_err());
        assert!(SearchQuery::new("bakery", anchor(), 100_001, None, 20).is_err());
        assert!(SearchQuery::new("bakery", anchor(), 500, None, 19).is_err());
        assert!(SearchQuery::new("bakery", anchor(), 500, None, 1001).is_err());
    }

    #[test]
    fn rejects_blank_text_and_trims_category() {
        assert!(matches!(
            SearchQuery::new("   ", anchor(), 500, None, 20),
            Err(CoreError::InvalidQuery(_))
        ));
        let q = SearchQuery::new(" bakery ", anchor(), 500, Some("  "), 20).unwrap();
        assert_eq!(q.text, "bakery");
        assert!(q.category.is_none());
    }
}
