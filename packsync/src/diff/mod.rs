//! Diff computation between a manifest and the scanned local state.
//!
//! Pure functions of their inputs: no I/O, no ordering requirements. The
//! two output sets are disjoint by construction: downloads come from keys
//! *present* in the manifest, deletions from keys *absent* from it.

use std::collections::{BTreeMap, BTreeSet};

use crate::manifest::Manifest;
use crate::object::is_asset_key;

/// The work a synchronization run has to perform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Manifest keys whose local copy is missing or stale.
    pub to_download: BTreeSet<String>,

    /// Non-asset local keys no longer declared by the manifest.
    pub to_delete: BTreeSet<String>,
}

impl SyncPlan {
    /// True when the local installation already matches the manifest.
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_delete.is_empty()
    }
}

/// Compare the manifest's object map against the local state.
///
/// Asset-namespace keys are additive and shared across bundles: they are
/// downloaded when missing or stale but never deleted.
pub fn compute_diff(manifest: &Manifest, local_state: &BTreeMap<String, String>) -> SyncPlan {
    let to_download = manifest
        .objects
        .iter()
        .filter(|(key, hash)| local_state.get(*key) != Some(hash))
        .map(|(key, _)| key.clone())
        .collect();

    let to_delete = local_state
        .keys()
        .filter(|key| !is_asset_key(key) && !manifest.objects.contains_key(*key))
        .cloned()
        .collect();

    SyncPlan {
        to_download,
        to_delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manifest_with(objects: &[(&str, &str)]) -> Manifest {
        serde_json::from_value(serde_json::json!({
            "name": "modpack-x",
            "version": "1.0",
            "objects": objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }))
        .unwrap()
    }

    fn state_with(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_mixed_namespaces_split_into_download_and_delete() {
        let manifest = manifest_with(&[("a.txt", "H1"), ("assets/b.png", "H2")]);
        let local = state_with(&[("a.txt", "H1"), ("c.txt", "H9")]);

        let plan = compute_diff(&manifest, &local);

        assert_eq!(
            plan.to_download,
            BTreeSet::from(["assets/b.png".to_string()])
        );
        assert_eq!(plan.to_delete, BTreeSet::from(["c.txt".to_string()]));
    }

    #[test]
    fn test_stale_hash_is_redownloaded() {
        let manifest = manifest_with(&[("mods/foo.jar", "H1")]);
        let local = state_with(&[("mods/foo.jar", "H0")]);

        let plan = compute_diff(&manifest, &local);

        assert!(plan.to_download.contains("mods/foo.jar"));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_stray_assets_are_never_deleted() {
        let manifest = manifest_with(&[("a.txt", "H1")]);
        let local = state_with(&[("a.txt", "H1"), ("assets/old/asset.png", "H5")]);

        let plan = compute_diff(&manifest, &local);

        assert!(plan.is_empty());
    }

    #[test]
    fn test_matching_state_is_idempotent() {
        let manifest = manifest_with(&[("a.txt", "H1"), ("assets/b.png", "H2")]);
        let local = state_with(&[("a.txt", "H1"), ("assets/b.png", "H2")]);

        assert!(compute_diff(&manifest, &local).is_empty());
    }

    fn object_maps() -> impl Strategy<Value = BTreeMap<String, String>> {
        let key = prop_oneof![
            "[a-c]{1,2}\\.txt",
            Just("assets/x.png".to_string()),
            Just("assets/y.png".to_string()),
        ];
        prop::collection::btree_map(key, "H[0-9]", 0..6)
    }

    proptest! {
        #[test]
        fn prop_download_and_delete_are_disjoint(
            objects in object_maps(),
            local in object_maps(),
        ) {
            let mut manifest = manifest_with(&[]);
            manifest.objects = objects;
            let plan = compute_diff(&manifest, &local);

            prop_assert!(plan.to_download.is_disjoint(&plan.to_delete));
        }

        #[test]
        fn prop_membership_conditions(
            objects in object_maps(),
            local in object_maps(),
        ) {
            let mut manifest = manifest_with(&[]);
            manifest.objects = objects;
            let plan = compute_diff(&manifest, &local);

            for key in &plan.to_download {
                let expected = &manifest.objects[key];
                prop_assert!(local.get(key) != Some(expected));
            }
            for key in &plan.to_delete {
                prop_assert!(!key.starts_with("assets/"));
                prop_assert!(!manifest.objects.contains_key(key));
            }
        }
    }
}
