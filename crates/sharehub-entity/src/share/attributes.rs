//! Scoped share attribute extensions.
//!
//! Attributes extend the permission bitmask with namespaced boolean
//! flags such as `permissions/download` without widening the mask
//! itself. They persist as a JSON array of `[scope, key, enabled]`
//! triples.

use serde::{Deserialize, Serialize};

use sharehub_core::result::AppResult;

/// One scoped attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAttribute {
    /// Attribute namespace, e.g. `permissions`.
    pub scope: String,
    /// Attribute name within the scope, e.g. `download`.
    pub key: String,
    /// Whether the capability is granted.
    pub enabled: bool,
}

/// Ordered collection of scoped attributes with upsert semantics: a
/// (scope, key) pair appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareAttributes {
    entries: Vec<ShareAttribute>,
}

impl ShareAttributes {
    /// An empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any existing value for the same
    /// (scope, key) pair.
    pub fn set(&mut self, scope: impl Into<String>, key: impl Into<String>, enabled: bool) {
        let scope = scope.into();
        let key = key.into();
        match self
            .entries
            .iter_mut()
            .find(|a| a.scope == scope && a.key == key)
        {
            Some(existing) => existing.enabled = enabled,
            None => self.entries.push(ShareAttribute {
                scope,
                key,
                enabled,
            }),
        }
    }

    /// Look up an attribute value.
    pub fn get(&self, scope: &str, key: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|a| a.scope == scope && a.key == key)
            .map(|a| a.enabled)
    }

    /// Whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ShareAttribute> {
        self.entries.iter()
    }

    /// Serialize to the persisted triple format. Empty sets persist as
    /// `None` so the column stays NULL.
    pub fn to_db(&self) -> AppResult<Option<String>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let triples: Vec<(&str, &str, bool)> = self
            .entries
            .iter()
            .map(|a| (a.scope.as_str(), a.key.as_str(), a.enabled))
            .collect();
        Ok(Some(serde_json::to_string(&triples)?))
    }

    /// Deserialize from the persisted triple format.
    pub fn from_db(data: &str) -> AppResult<Self> {
        let triples: Vec<(String, String, bool)> = serde_json::from_str(data)?;
        let mut attributes = Self::new();
        for (scope, key, enabled) in triples {
            attributes.set(scope, key, enabled);
        }
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_upsert() {
        let mut attrs = ShareAttributes::new();
        attrs.set("permissions", "download", true);
        attrs.set("permissions", "download", false);
        assert_eq!(attrs.get("permissions", "download"), Some(false));
        assert_eq!(attrs.iter().count(), 1);
    }

    #[test]
    fn test_db_roundtrip() {
        let mut attrs = ShareAttributes::new();
        attrs.set("permissions", "download", false);
        attrs.set("watermark", "apply", true);

        let data = attrs.to_db().expect("serialize").expect("non-empty");
        let parsed = ShareAttributes::from_db(&data).expect("deserialize");
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn test_empty_persists_as_null() {
        assert_eq!(ShareAttributes::new().to_db().expect("serialize"), None);
    }
}
