//! Render-time image resolution. An image slot starts at the best reference
//! the record currently has (old external URL, migrated managed URL, or
//! nothing) and degrades through a fixed chain on load failure: first the
//! primary URL, then a slug-derived local asset, then a static gradient
//! placeholder that needs no network at all. At most two load attempts are
//! ever made for one slot.

use serde::Serialize;

/// Local asset shipped with the site for a fallback key (a destination
/// slug).
pub fn local_fallback_path(key: &str) -> String {
    format!("/images/destinations/{}.jpg", key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageSlot {
    Primary { url: String, fallback_key: String },
    LocalFallback { path: String },
    Placeholder,
}

impl ImageSlot {
    pub fn new(primary: Option<String>, fallback_key: &str) -> Self {
        match primary {
            Some(url) => ImageSlot::Primary {
                url,
                fallback_key: fallback_key.to_string(),
            },
            None if !fallback_key.is_empty() => ImageSlot::LocalFallback {
                path: local_fallback_path(fallback_key),
            },
            None => ImageSlot::Placeholder,
        }
    }

    /// Source to attempt loading, or None once the slot has settled on the
    /// placeholder.
    pub fn src(&self) -> Option<&str> {
        match self {
            ImageSlot::Primary { url, .. } => Some(url),
            ImageSlot::LocalFallback { path } => Some(path),
            ImageSlot::Placeholder => None,
        }
    }

    /// Advances the chain after a load failure. The primary-to-local
    /// transition can fire at most once because the state it leaves is
    /// never re-entered; Placeholder is terminal.
    pub fn on_load_error(&mut self) {
        *self = match self {
            ImageSlot::Primary { fallback_key, .. } if !fallback_key.is_empty() => {
                ImageSlot::LocalFallback {
                    path: local_fallback_path(fallback_key),
                }
            }
            ImageSlot::Primary { .. } => ImageSlot::Placeholder,
            ImageSlot::LocalFallback { .. } => ImageSlot::Placeholder,
            ImageSlot::Placeholder => ImageSlot::Placeholder,
        };
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageSlot::Placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_terminates_after_two_failures() {
        let mut slot = ImageSlot::new(
            Some("https://cdn.example.com/canada.jpg".to_string()),
            "canada",
        );
        assert_eq!(slot.src(), Some("https://cdn.example.com/canada.jpg"));

        slot.on_load_error();
        assert_eq!(slot.src(), Some("/images/destinations/canada.jpg"));

        slot.on_load_error();
        assert!(slot.is_terminal());
        assert_eq!(slot.src(), None);

        // no third attempt, ever
        slot.on_load_error();
        assert_eq!(slot, ImageSlot::Placeholder);
    }

    #[test]
    fn test_null_primary_starts_at_local_fallback() {
        let slot = ImageSlot::new(None, "germany");
        assert_eq!(slot.src(), Some("/images/destinations/germany.jpg"));
    }

    #[test]
    fn test_nothing_resolvable_is_placeholder_immediately() {
        let slot = ImageSlot::new(None, "");
        assert!(slot.is_terminal());
    }

    #[test]
    fn test_primary_without_fallback_key_goes_straight_to_placeholder() {
        let mut slot = ImageSlot::new(Some("https://cdn.example.com/x.jpg".to_string()), "");
        slot.on_load_error();
        assert!(slot.is_terminal());
    }
}
