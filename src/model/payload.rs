use serde::{Deserialize, Serialize};

use crate::model::account::{AccountId, Region};
use crate::model::selector::AccountSelector;

/// Literal region token that expands to every known region.
pub const ALL_REGIONS: &str = "ALL";

/// Base template shape shared by every worker (spec.md §3, AccountPayload's
/// common fields plus the SINGLE strategy's entire payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseTemplate {
    #[serde(rename = "TemplateName")]
    pub template_name: String,
    #[serde(rename = "TemplateDescription")]
    pub template_description: String,
}

/// AccountPayload: the base template shape consumed by C7 for ACCOUNT workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPayload {
    #[serde(rename = "TemplateName")]
    pub template_name: String,
    #[serde(rename = "TemplateDescription")]
    pub template_description: String,
    #[serde(rename = "IncludeAccounts")]
    pub include_accounts: AccountSelector,
    #[serde(rename = "ExcludeAccounts", default)]
    pub exclude_accounts: Option<AccountSelector>,
    #[serde(rename = "OperateInOrgRoot", default)]
    pub operate_in_org_root: bool,
    /// Populated by C7 before enqueue; rejected if already present in the
    /// authored template (resolves spec.md §9 Open Question (a)).
    #[serde(rename = "StarbaseAssignedAccount", default, skip_serializing_if = "Option::is_none")]
    pub starbase_assigned_account: Option<AccountId>,
}

impl AccountPayload {
    /// Structural/semantic checks surfaced as `PayloadValidation`.
    pub fn validate(&self) -> Result<(), String> {
        if self.include_accounts.all_accounts && self.include_accounts.is_empty_of_clauses() {
            // fine: the all-accounts clause alone
        } else {
            self.include_accounts.validate_all_accounts_exclusive()?;
        }
        if !self.include_accounts.all_accounts && self.include_accounts.is_empty_of_clauses() {
            return Err("IncludeAccounts must select at least one clause".to_string());
        }
        if let Some(exclude) = &self.exclude_accounts {
            exclude.validate_all_accounts_exclusive()?;
            if exclude.all_accounts {
                return Err("ExcludeAccounts may not set AllAccounts".to_string());
            }
        }
        Ok(())
    }

    /// Checked separately from [`Self::validate`] so callers can surface it
    /// as `InvalidTemplateForFanout` rather than a generic schema failure
    /// (spec.md §9 Open Question (a): reject rather than silently overwrite).
    pub fn reject_preassigned(&self) -> Result<(), String> {
        if self.starbase_assigned_account.is_some() {
            return Err(
                "StarbaseAssignedAccount must not be present in an authored template".to_string(),
            );
        }
        Ok(())
    }
}

/// AccountRegionPayload extends AccountPayload with region clauses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegionPayload {
    #[serde(flatten)]
    pub account: AccountPayload,
    #[serde(rename = "IncludeRegions")]
    pub include_regions: Vec<String>,
    #[serde(rename = "ExcludeRegions", default)]
    pub exclude_regions: Vec<String>,
    #[serde(rename = "StarbaseAssignedRegion", default, skip_serializing_if = "Option::is_none")]
    pub starbase_assigned_region: Option<Region>,
}

impl AccountRegionPayload {
    pub fn validate(&self, known_regions: &std::collections::HashSet<Region>) -> Result<(), String> {
        self.account.validate()?;
        let wants_all = self
            .include_regions
            .iter()
            .any(|r| r == ALL_REGIONS);
        if wants_all && self.include_regions.len() > 1 {
            return Err(format!(
                "IncludeRegions: [{ALL_REGIONS}] may not be combined with any other entry"
            ));
        }
        if !wants_all {
            for r in &self.include_regions {
                if !known_regions.contains(&Region(r.clone())) {
                    return Err(format!("IncludeRegions references unknown region '{r}'"));
                }
            }
        }
        for r in &self.exclude_regions {
            if !known_regions.contains(&Region(r.clone())) {
                return Err(format!("ExcludeRegions references unknown region '{r}'"));
            }
        }
        Ok(())
    }

    pub fn reject_preassigned(&self) -> Result<(), String> {
        self.account.reject_preassigned()?;
        if self.starbase_assigned_region.is_some() {
            return Err(
                "StarbaseAssignedRegion must not be present in an authored template".to_string(),
            );
        }
        Ok(())
    }

    /// Expands the literal `ALL` token against the known-region universe.
    pub fn resolved_include_regions(
        &self,
        known_regions: &std::collections::HashSet<Region>,
    ) -> std::collections::HashSet<Region> {
        if self.include_regions.iter().any(|r| r == ALL_REGIONS) {
            known_regions.clone()
        } else {
            self.include_regions.iter().map(|r| Region(r.clone())).collect()
        }
    }

    pub fn resolved_exclude_regions(&self) -> std::collections::HashSet<Region> {
        self.exclude_regions.iter().map(|r| Region(r.clone())).collect()
    }
}
