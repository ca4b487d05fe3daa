//! Account index (C3): an in-memory inverted index over accounts, built
//! once from a JSON snapshot and immutable thereafter.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Account, AccountId, OuType, ParentRef, Region, Result, StarfleetError};

/// Wire shape of a single account record in the snapshot (spec.md §6).
/// UpperCamelCase on disk, normalized to snake_case in [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotAccount {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Parents", default)]
    parents: Vec<SnapshotParent>,
    #[serde(rename = "Regions", default)]
    regions: Vec<String>,
    #[serde(rename = "Tags", default)]
    tags: HashMap<String, String>,
    #[serde(rename = "IsOrgRoot", default)]
    is_org_root: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotParent {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    kind: OuType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotDocument {
    accounts: HashMap<String, SnapshotAccount>,
    generated: DateTime<Utc>,
}

/// In-memory inverted index over accounts (spec.md §4.3).
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    by_id: HashSet<AccountId>,
    accounts: HashMap<AccountId, Account>,
    by_name: HashMap<String, AccountId>,
    id_to_name: HashMap<AccountId, String>,
    by_ou: HashMap<String, HashSet<AccountId>>,
    by_region: HashMap<Region, HashSet<AccountId>>,
    by_tag: HashMap<String, HashMap<String, HashSet<AccountId>>>,
    org_roots: HashSet<AccountId>,
    generated_at: Option<DateTime<Utc>>,
}

impl AccountIndex {
    /// Parses the snapshot and populates every derived set, independent of
    /// how the bytes were obtained (object-store fetch or a test fixture).
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let doc: SnapshotDocument = serde_json::from_slice(bytes).map_err(|e| {
            StarfleetError::TemplateFetch {
                key: "accountIndex.json".to_string(),
                reason: format!("malformed account index snapshot: {e}"),
            }
        })?;

        let mut index = AccountIndex::default();
        index.generated_at = Some(doc.generated);

        for (raw_id, snap) in doc.accounts {
            let id = AccountId::new(&raw_id).map_err(|reason| StarfleetError::TemplateFetch {
                key: "accountIndex.json".to_string(),
                reason,
            })?;

            let parents = snap
                .parents
                .into_iter()
                .map(|p| ParentRef {
                    id: p.id,
                    name: p.name,
                    kind: p.kind,
                })
                .collect::<Vec<_>>();
            let regions: HashSet<Region> = snap.regions.iter().map(|r| Region(r.clone())).collect();
            let tags: HashMap<String, String> = snap.tags.clone();

            let account = Account {
                id: id.clone(),
                name: snap.name.clone(),
                parents: parents.clone(),
                regions: regions.clone(),
                tags: tags.clone(),
                snapshot_is_root: snap.is_org_root,
            };

            index.by_id.insert(id.clone());
            index
                .by_name
                .insert(snap.name.to_lowercase(), id.clone());
            index.id_to_name.insert(id.clone(), snap.name.clone());

            for parent in &parents {
                index
                    .by_ou
                    .entry(parent.id.to_lowercase())
                    .or_default()
                    .insert(id.clone());
                index
                    .by_ou
                    .entry(parent.name.to_lowercase())
                    .or_default()
                    .insert(id.clone());
            }

            for region in &regions {
                index
                    .by_region
                    .entry(region.clone())
                    .or_default()
                    .insert(id.clone());
            }

            for (name, value) in &tags {
                index
                    .by_tag
                    .entry(name.to_lowercase())
                    .or_default()
                    .entry(value.to_lowercase())
                    .or_default()
                    .insert(id.clone());
            }

            if account.is_org_root() {
                index.org_roots.insert(id.clone());
            }

            index.accounts.insert(id, account);
        }

        Ok(index)
    }

    pub fn get_by_ids(&self, ids: &[String]) -> HashSet<AccountId> {
        ids.iter()
            .filter_map(|raw| AccountId::new(raw).ok())
            .filter(|id| self.by_id.contains(id))
            .collect()
    }

    pub fn get_by_aliases(&self, names: &[String]) -> HashSet<AccountId> {
        names
            .iter()
            .filter_map(|name| self.by_name.get(&name.to_lowercase()).cloned())
            .collect()
    }

    pub fn get_by_ou(&self, key: &str) -> HashSet<AccountId> {
        self.by_ou.get(&key.to_lowercase()).cloned().unwrap_or_default()
    }

    pub fn get_by_tag(&self, name: &str, value: &str) -> HashSet<AccountId> {
        self.by_tag
            .get(&name.to_lowercase())
            .and_then(|by_value| by_value.get(&value.to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_by_regions(&self, regions: &HashSet<Region>) -> HashMap<Region, HashSet<AccountId>> {
        regions
            .iter()
            .map(|r| (r.clone(), self.by_region.get(r).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn get_for_all_regions(&self) -> &HashMap<Region, HashSet<AccountId>> {
        &self.by_region
    }

    pub fn get_all(&self) -> HashSet<AccountId> {
        self.by_id.clone()
    }

    pub fn get_org_roots(&self) -> HashSet<AccountId> {
        self.org_roots.clone()
    }

    pub fn get_names(&self, ids: &HashSet<AccountId>) -> HashMap<AccountId, Option<String>> {
        ids.iter()
            .map(|id| (id.clone(), self.id_to_name.get(id).cloned()))
            .collect()
    }

    pub fn get_account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn known_regions(&self) -> HashSet<Region> {
        self.by_region.keys().cloned().collect()
    }

    /// The snapshot's own `generated` timestamp, `None` only for a
    /// default-constructed index that was never parsed from a snapshot.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(accounts: serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "accounts": accounts,
            "generated": "2026-01-01T00:00:00Z",
        })
        .to_string()
        .into_bytes()
    }

    fn fixture() -> AccountIndex {
        let bytes = snapshot_with(serde_json::json!({
            "000000000001": {
                "Name": "Account 1",
                "Parents": [{"Id": "ou-root", "Name": "Root OU", "Type": "ROOT"}],
                "Regions": ["us-east-1", "us-west-1"],
                "Tags": {"Team": "Platform"},
                "IsOrgRoot": false,
            },
            "000000000020": {
                "Name": "Management",
                "Parents": [{"Id": "ou-root", "Name": "Root OU", "Type": "ROOT"}],
                "Regions": ["us-east-1"],
                "Tags": {},
                "IsOrgRoot": true,
            },
        }));
        AccountIndex::parse_bytes(&bytes).unwrap()
    }

    #[test]
    fn builds_every_derived_set() {
        let index = fixture();
        assert_eq!(index.get_all().len(), 2);
        assert!(index.get_org_roots().contains(&AccountId::new("000000000020").unwrap()));
        assert!(!index.get_org_roots().contains(&AccountId::new("000000000001").unwrap()));
    }

    #[test]
    fn region_membership_invariant_holds() {
        let index = fixture();
        let acc1 = AccountId::new("000000000001").unwrap();
        let result = index.get_by_regions(&[Region::from("us-east-1")].into_iter().collect());
        assert!(result[&Region::from("us-east-1")].contains(&acc1));
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let index = fixture();
        let by_lower = index.get_by_aliases(&["account 1".to_string()]);
        let by_mixed = index.get_by_aliases(&["AcCoUnT 1".to_string()]);
        assert_eq!(by_lower, by_mixed);
        assert_eq!(by_lower.len(), 1);
    }

    #[test]
    fn ou_lookup_matches_both_id_and_name() {
        let index = fixture();
        let by_id = index.get_by_ou("ou-root");
        let by_name = index.get_by_ou("Root OU");
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.len(), 2);
    }

    #[test]
    fn tag_lookup_is_case_insensitive_and_unknown_is_empty() {
        let index = fixture();
        assert_eq!(index.get_by_tag("team", "platform").len(), 1);
        assert_eq!(index.get_by_tag("TEAM", "PLATFORM").len(), 1);
        assert!(index.get_by_tag("nope", "nope").is_empty());
    }

    #[test]
    fn unknown_keys_return_empty_never_fail() {
        let index = fixture();
        assert!(index.get_by_ou("fakeOU").is_empty());
        assert!(index.get_by_aliases(&["nonexistent".to_string()]).is_empty());
        assert!(index.get_by_ids(&["999999999999".to_string()]).is_empty());
    }

    #[test]
    fn malformed_snapshot_is_template_fetch_error() {
        let err = AccountIndex::parse_bytes(b"not json").unwrap_err();
        assert!(matches!(err, StarfleetError::TemplateFetch { .. }));
    }
}
