use serde::{Deserialize, Serialize};
use std::fmt;

/// A 12-character decimal account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Builds an `AccountId`, enforcing the "12-character decimal identifier" invariant.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.len() != 12 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "account id '{raw}' must be exactly 12 decimal digits"
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A region code, e.g. `us-east-1`. Kept distinct from free-form tag values,
/// which are folded to lowercase on ingest; region codes are already
/// canonical lowercase and compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region(pub String);

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OuType {
    OrganizationalUnit,
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OuType,
}

/// An account entity as held by the account index (C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Ordered chain from immediate parent OU up to organization root.
    pub parents: Vec<ParentRef>,
    pub regions: std::collections::HashSet<Region>,
    /// Tag name -> tag value, both case-insensitive at lookup time; stored
    /// in the casing the snapshot provided.
    pub tags: std::collections::HashMap<String, String>,
    /// True in the snapshot's own classification of this account as an
    /// organization-root account (distinct from merely having a ROOT parent).
    pub snapshot_is_root: bool,
}

impl Account {
    /// Derived per spec.md §3: true iff any parent element has type ROOT
    /// *and* the snapshot itself classifies this account as a root account.
    pub fn is_org_root(&self) -> bool {
        self.snapshot_is_root && self.parents.iter().any(|p| p.kind == OuType::Root)
    }
}
