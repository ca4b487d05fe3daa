use serde::{Deserialize, Serialize};

/// A `{name, value}` tag clause, as authored in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagClause {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// The declarative account selector sub-structure shared by include and
/// exclude clauses (spec.md §3, AccountSelector).
///
/// `all_accounts` is only meaningful on the include-flavor selector; the
/// exclude-flavor selector never sets it (enforced at validation time by
/// [`crate::model::payload::AccountPayload::validate`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSelector {
    #[serde(rename = "ByIds", default, skip_serializing_if = "Vec::is_empty")]
    pub by_ids: Vec<String>,
    #[serde(rename = "ByNames", default, skip_serializing_if = "Vec::is_empty")]
    pub by_names: Vec<String>,
    #[serde(rename = "ByOrgUnits", default, skip_serializing_if = "Vec::is_empty")]
    pub by_org_units: Vec<String>,
    #[serde(rename = "ByTags", default, skip_serializing_if = "Vec::is_empty")]
    pub by_tags: Vec<TagClause>,
    #[serde(rename = "AllAccounts", default, skip_serializing_if = "std::ops::Not::not")]
    pub all_accounts: bool,
}

impl AccountSelector {
    pub fn is_empty_of_clauses(&self) -> bool {
        self.by_ids.is_empty()
            && self.by_names.is_empty()
            && self.by_org_units.is_empty()
            && self.by_tags.is_empty()
    }

    /// `AllAccounts: true` combined with any other selector clause is a
    /// validation error (spec.md §8 boundary behavior).
    pub fn validate_all_accounts_exclusive(&self) -> Result<(), String> {
        if self.all_accounts && !self.is_empty_of_clauses() {
            return Err(
                "AllAccounts may not be combined with ByIds/ByNames/ByOrgUnits/ByTags".to_string(),
            );
        }
        Ok(())
    }
}
