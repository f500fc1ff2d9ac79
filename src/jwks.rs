//! Key sets and verification-key selection

use serde::Deserialize;

use crate::jwk::Jwk;

/// A JSON Web Key Set (JWKS) as served by the authorization server
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// A view of the keys in this set
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Whether the set contains no keys at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// Selects the verification key for a token
    ///
    /// A `kid` hint is matched exactly and case-sensitively against the
    /// set; when the hint matches nothing (or no hint is present), a set
    /// holding exactly one key falls back to that key. A multi-key set
    /// without a usable hint selects nothing — an ambiguous lookup must
    /// never pick an arbitrary key.
    pub fn select_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        if let Some(kid) = kid {
            if let Some(found) = self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)) {
                return Some(found);
            }
        }

        if self.keys.len() == 1 {
            return self.keys.first();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use crate::test;

    use super::*;

    #[test]
    fn decodes_a_published_key_set() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_MIXED)?;
        assert_eq!(jwks.keys().len(), 3);
        Ok(())
    }

    #[test]
    fn decodes_a_document_without_keys_as_empty() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(r#"{"keys":[]}"#)?;
        assert!(jwks.is_empty());

        let jwks: Jwks = serde_json::from_str(r#"{}"#)?;
        assert!(jwks.is_empty());
        Ok(())
    }

    #[test]
    fn selects_by_exact_key_id() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_MIXED)?;

        let key = jwks.select_key(Some("wlo-rs-2")).expect("key is published");
        assert_eq!(key.kid.as_deref(), Some("wlo-rs-2"));
        Ok(())
    }

    #[test]
    fn key_id_match_is_case_sensitive() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_MIXED)?;
        assert!(jwks.select_key(Some("WLO-RS-2")).is_none());
        Ok(())
    }

    #[test]
    fn falls_back_to_a_lone_key_when_the_hint_matches_nothing() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_SINGLE)?;

        let key = jwks.select_key(Some("absent")).expect("single-key fallback");
        assert_eq!(key.kid.as_deref(), Some("wlo-rs-1"));
        Ok(())
    }

    #[test]
    fn falls_back_to_a_lone_key_without_a_hint() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_SINGLE)?;
        assert!(jwks.select_key(None).is_some());
        Ok(())
    }

    #[test]
    fn refuses_an_ambiguous_multi_key_set() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::JWKS_MIXED)?;

        assert!(jwks.select_key(None).is_none());
        assert!(jwks.select_key(Some("absent")).is_none());
        Ok(())
    }

    #[test]
    fn selects_nothing_from_an_empty_set() {
        let jwks = Jwks::default();
        assert!(jwks.select_key(None).is_none());
        assert!(jwks.select_key(Some("any")).is_none());
    }
}
