use super::{InvalidRedirectTarget, PathSpliceRewriter, RedirectLayer, RedirectTargets};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable configuration of a [`RedirectLayer`].
///
/// ```
/// use detour_http::layer::redirect::RedirectConfig;
///
/// let config = RedirectConfig::from_json(r#"{
///     "targets": { "foo": "https://example.com/test1/list/" },
///     "default_ignore_segments": 1
/// }"#).unwrap();
/// assert_eq!(config.path_cache_capacity, 100);
///
/// let layer = config.build().unwrap();
/// assert!(layer.targets().contains("foo"));
/// assert_eq!(layer.default_ignore_segments(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Targets to register, by name.
    pub targets: BTreeMap<String, String>,
    /// Path segments dropped when a request does not specify it.
    pub default_ignore_segments: usize,
    /// Capacity of the rewritten path cache.
    pub path_cache_capacity: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            targets: BTreeMap::new(),
            default_ignore_segments: 0,
            path_cache_capacity: PathSpliceRewriter::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl RedirectConfig {
    /// Parse a [`RedirectConfig`] from a json document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build a [`RedirectLayer`] with a fresh registry holding the configured targets.
    ///
    /// Fails on the first target that is not a valid redirect target.
    pub fn build(&self) -> Result<RedirectLayer, InvalidRedirectTarget> {
        let targets = RedirectTargets::new();
        for (name, target) in &self.targets {
            targets.put(name.as_str(), target)?;
        }
        Ok(RedirectLayer::new(targets)
            .with_rewriter(PathSpliceRewriter::with_cache_capacity(
                self.path_cache_capacity,
            ))
            .with_default_ignore_segments(self.default_ignore_segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(RedirectConfig::from_json("{}").unwrap(), RedirectConfig::default());
    }

    #[test]
    fn negative_default_is_rejected() {
        assert!(RedirectConfig::from_json(r#"{"default_ignore_segments": -1}"#).is_err());
    }

    #[test]
    fn build_rejects_invalid_target() {
        let config = RedirectConfig {
            targets: [("bad".to_owned(), "ftp://example.com".to_owned())].into(),
            ..Default::default()
        };
        let err = config.build().unwrap_err();
        assert_eq!(err.input(), "ftp://example.com");
    }

    #[test]
    fn zero_cache_capacity_uses_default() {
        let config = RedirectConfig::from_json(r#"{"path_cache_capacity": 0}"#).unwrap();
        let layer = config.build().unwrap();
        assert_eq!(
            layer.rewriter().cache_capacity(),
            PathSpliceRewriter::DEFAULT_CACHE_CAPACITY
        );
    }

    #[test]
    fn serialize_roundtrip_keeps_targets() {
        let config = RedirectConfig {
            targets: [("foo".to_owned(), "https://example.com/".to_owned())].into(),
            default_ignore_segments: 2,
            path_cache_capacity: 10,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RedirectConfig::from_json(&json).unwrap(), config);
    }
}
