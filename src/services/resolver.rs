//! Maps a client-supplied path to a real bucket key.
//!
//! Tiers run in a fixed order against one freshly fetched listing and the
//! first tier that hits wins:
//!
//! 1. exact match on the path as given, then on its decoded form
//! 2. case-insensitive match, same order
//! 3. filename-anchored fuzzy match on the decoded form (or the raw path when
//!    decoding changed nothing), accepted only above the score threshold
//!
//! Folder markers and suspicious keys are not filtered here.

use crate::{
    models::collection::ObjectCollection,
    services::{
        path_guard::{decode_path, is_suspicious},
        storage_service::{ObjectStorage, StorageResult},
    },
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    ExactDecoded,
    CaseInsensitive,
    CaseInsensitiveDecoded,
    Fuzzy { score: u32 },
}

/// A canonical key and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: String,
    pub tier: MatchTier,
}

#[derive(Clone)]
pub struct Resolver {
    storage: Arc<dyn ObjectStorage>,
}

impl Resolver {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Resolve `raw_path` to a key, `Ok(None)` when nothing matches.
    ///
    /// A decode failure is not an error; the raw path is used alone. A decoded
    /// form containing `..` or `//` is never looked up.
    pub async fn resolve(&self, raw_path: &str) -> StorageResult<Option<Resolution>> {
        let decoded = match decode_path(raw_path) {
            Ok(decoded) if is_suspicious(&decoded) => {
                warn!("ignoring suspicious decoded form of {}", raw_path);
                None
            }
            Ok(decoded) if decoded != raw_path => {
                debug!("decoded path {} -> {}", raw_path, decoded);
                Some(decoded)
            }
            Ok(_) => None,
            Err(err) => {
                warn!("could not decode {}: {}", raw_path, err);
                None
            }
        };

        if raw_path.is_empty() {
            return Ok(None);
        }

        let listing = self.storage.list_objects().await?;
        if listing.is_empty() {
            debug!("bucket {} is empty", self.storage.bucket());
            return Ok(None);
        }
        let found = match_tiers(&listing, raw_path, decoded.as_deref());
        match &found {
            Some(Resolution {
                key,
                tier: MatchTier::Exact | MatchTier::ExactDecoded,
            }) => debug!("exact match {}", key),
            Some(Resolution { key, tier }) => {
                info!("resolved {} to {} ({:?})", raw_path, key, tier)
            }
            None => debug!("object not found in bucket: {}", raw_path),
        }
        Ok(found)
    }
}

/// Run the tiers against a listing. `decoded` is only set when decoding
/// produced a string different from `raw`.
pub fn match_tiers(
    listing: &ObjectCollection,
    raw: &str,
    decoded: Option<&str>,
) -> Option<Resolution> {
    let hit = |key: &str, tier| {
        Some(Resolution {
            key: key.to_string(),
            tier,
        })
    };

    if let Some(obj) = listing.find_exact(raw) {
        return hit(&obj.key, MatchTier::Exact);
    }
    if let Some(obj) = decoded.and_then(|d| listing.find_exact(d)) {
        return hit(&obj.key, MatchTier::ExactDecoded);
    }
    if let Some(obj) = listing.find_case_insensitive(raw) {
        return hit(&obj.key, MatchTier::CaseInsensitive);
    }
    if let Some(obj) = decoded.and_then(|d| listing.find_case_insensitive(d)) {
        return hit(&obj.key, MatchTier::CaseInsensitiveDecoded);
    }

    let fuzzy = listing.find_fuzzy(decoded.unwrap_or(raw));
    fuzzy
        .accepted()
        .and_then(|obj| hit(&obj.key, MatchTier::Fuzzy { score: fuzzy.score }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::object::StoredObject, services::memory_storage::MemoryStorage};
    use proptest::prelude::*;

    fn listing(keys: &[&str]) -> ObjectCollection {
        keys.iter().map(|k| StoredObject::new(*k, 1)).collect()
    }

    fn resolver(keys: &[&str]) -> (Resolver, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::with_keys(keys));
        (Resolver::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn empty_path_is_not_found_without_listing() {
        let (resolver, storage) = resolver(&["a.txt"]);
        assert_eq!(resolver.resolve("").await.unwrap(), None);
        assert_eq!(storage.list_calls(), 0);
    }

    #[tokio::test]
    async fn listing_error_propagates() {
        let storage = Arc::new(MemoryStorage::with_keys(&["a.txt"]).failing_list());
        let resolver = Resolver::new(storage);
        assert!(resolver.resolve("a.txt").await.is_err());
    }

    #[tokio::test]
    async fn each_resolve_lists_once() {
        let (resolver, storage) = resolver(&["a/b.txt"]);
        resolver.resolve("a/b.txt").await.unwrap();
        resolver.resolve("nope").await.unwrap();
        assert_eq!(storage.list_calls(), 2);
    }

    #[tokio::test]
    async fn undecodable_path_still_resolves_raw() {
        let (resolver, _) = resolver(&["100%.txt"]);
        let found = resolver.resolve("100%.txt").await.unwrap().unwrap();
        assert_eq!(found.key, "100%.txt");
        assert_eq!(found.tier, MatchTier::Exact);
    }

    #[tokio::test]
    async fn decoded_form_is_tried() {
        let (resolver, _) = resolver(&["my docs/a b.txt"]);
        let found = resolver.resolve("my%20docs/a+b.txt").await.unwrap().unwrap();
        assert_eq!(found.key, "my docs/a b.txt");
        assert_eq!(found.tier, MatchTier::ExactDecoded);
    }

    #[tokio::test]
    async fn suspicious_decoded_form_never_matches() {
        let (resolver, _) = resolver(&["a/../b.txt", "a//b.txt"]);
        assert_eq!(resolver.resolve("a%2F%2e%2e%2Fb.txt").await.unwrap(), None);
        assert_eq!(resolver.resolve("a%2F%2Fb.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_bucket_is_not_found() {
        let (resolver, storage) = resolver(&[]);
        assert_eq!(resolver.resolve("a.txt").await.unwrap(), None);
        assert_eq!(storage.list_calls(), 1);
    }

    #[test]
    fn raw_exact_beats_decoded_exact() {
        let l = listing(&["a b.txt", "a+b.txt"]);
        let found = match_tiers(&l, "a+b.txt", Some("a b.txt")).unwrap();
        assert_eq!(found.key, "a+b.txt");
        assert_eq!(found.tier, MatchTier::Exact);
    }

    #[test]
    fn exact_tier_beats_case_insensitive_and_fuzzy() {
        let l = listing(&["DOCS/A.txt", "docs/a.txt"]);
        let found = match_tiers(&l, "docs/a.txt", None).unwrap();
        assert_eq!(found.key, "docs/a.txt");
        assert_eq!(found.tier, MatchTier::Exact);
    }

    #[test]
    fn case_insensitive_raw_then_decoded() {
        let l = listing(&["Photos/IMG_01.JPG"]);
        let found = match_tiers(&l, "photos/img_01.jpg", None).unwrap();
        assert_eq!(found.tier, MatchTier::CaseInsensitive);

        let l = listing(&["My Photos/IMG.JPG"]);
        let found = match_tiers(&l, "my%20photos/img.jpg", Some("my photos/img.jpg")).unwrap();
        assert_eq!(found.key, "My Photos/IMG.JPG");
        assert_eq!(found.tier, MatchTier::CaseInsensitiveDecoded);
    }

    #[test]
    fn fuzzy_uses_decoded_path() {
        let l = listing(&["reports/2024/q1 final.pdf"]);
        let found = match_tiers(
            &l,
            "reports%2F2023%2Fq1+final.pdf",
            Some("reports/2023/q1 final.pdf"),
        )
        .unwrap();
        assert_eq!(found.key, "reports/2024/q1 final.pdf");
        assert_eq!(found.tier, MatchTier::Fuzzy { score: 36 });
    }

    #[test]
    fn weak_fuzzy_is_not_found() {
        let l = listing(&["zzzzzz/q1.pdf"]);
        assert_eq!(match_tiers(&l, "abcdef/q1.pdf", None), None);
    }

    #[test]
    fn single_component_request_never_fuzzes() {
        let l = listing(&["dir/q1.pdf"]);
        assert_eq!(match_tiers(&l, "q1.pdf", None), None);
    }

    fn unique_keys() -> impl Strategy<Value = Vec<String>> {
        prop::collection::hash_set("[a-z0-9_-]{1,5}(/[a-z0-9_-]{1,5}){0,3}\\.[a-z]{1,3}", 1..20)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #[test]
        fn every_listed_key_resolves_to_itself(keys in unique_keys(), pick in any::<prop::sample::Index>()) {
            let l: ObjectCollection = keys.iter().map(|k| StoredObject::new(k.clone(), 1)).collect();
            let key = pick.get(&keys);
            let decoded = decode_path(key).ok().filter(|d| d != key);
            let found = match_tiers(&l, key, decoded.as_deref()).unwrap();
            prop_assert_eq!(&found.key, key);
        }

        #[test]
        fn uppercased_key_resolves_case_insensitively(keys in unique_keys(), pick in any::<prop::sample::Index>()) {
            let l: ObjectCollection = keys.iter().map(|k| StoredObject::new(k.clone(), 1)).collect();
            let key = pick.get(&keys);
            let upper = key.to_uppercase();
            let decoded = decode_path(&upper).ok().filter(|d| *d != upper);
            let found = match_tiers(&l, &upper, decoded.as_deref()).unwrap();
            prop_assert_eq!(&found.key, key);
        }
    }
}
