//! Resolver (C4): evaluates a declarative account/account-region selector
//! against the account index, producing either `Set<AccountId>` or
//! `Map<AccountId, Set<Region>>`.

use std::collections::{HashMap, HashSet};

use crate::index::AccountIndex;
use crate::model::{AccountId, AccountPayload, AccountRegionPayload, AccountSelector, Region};

fn union_clauses(selector: &AccountSelector, index: &AccountIndex) -> HashSet<AccountId> {
    let mut result = index.get_by_ids(&selector.by_ids);
    result.extend(index.get_by_aliases(&selector.by_names));
    for ou in &selector.by_org_units {
        result.extend(index.get_by_ou(ou));
    }
    for clause in &selector.by_tags {
        result.extend(index.get_by_tag(&clause.name, &clause.value));
    }
    result
}

/// `resolve_accounts(payload)` — spec.md §4.4.
pub fn resolve_accounts(payload: &AccountPayload, index: &AccountIndex) -> HashSet<AccountId> {
    let included = if payload.include_accounts.all_accounts {
        index.get_all()
    } else {
        union_clauses(&payload.include_accounts, index)
    };

    let excluded = payload
        .exclude_accounts
        .as_ref()
        .map(|selector| union_clauses(selector, index))
        .unwrap_or_default();

    let mut result: HashSet<AccountId> = included.difference(&excluded).cloned().collect();

    if !payload.operate_in_org_root {
        let org_roots = index.get_org_roots();
        result = result.difference(&org_roots).cloned().collect();
    }

    result
}

/// `resolve_account_regions(payload, org_root_check)` — spec.md §4.4.
///
/// `scope_to_regions`: the optional global region scope from
/// `STARFLEET.ScopeToRegions`; an empty set means "no scope applied".
pub fn resolve_account_regions(
    payload: &AccountRegionPayload,
    index: &AccountIndex,
    scope_to_regions: &HashSet<Region>,
    org_root_check: bool,
) -> HashMap<AccountId, HashSet<Region>> {
    let accounts = if org_root_check {
        resolve_accounts(&payload.account, index)
    } else {
        let included = if payload.account.include_accounts.all_accounts {
            index.get_all()
        } else {
            union_clauses(&payload.account.include_accounts, index)
        };
        let excluded = payload
            .account
            .exclude_accounts
            .as_ref()
            .map(|selector| union_clauses(selector, index))
            .unwrap_or_default();
        included.difference(&excluded).cloned().collect()
    };

    let known_regions = index.known_regions();
    let include_regions = payload.resolved_include_regions(&known_regions);
    let exclude_regions = payload.resolved_exclude_regions();
    let mut regions: HashSet<Region> = include_regions
        .difference(&exclude_regions)
        .cloned()
        .collect();

    if !scope_to_regions.is_empty() {
        regions = regions.intersection(scope_to_regions).cloned().collect();
    }

    let region_accounts = index.get_by_regions(&regions);

    accounts
        .into_iter()
        .map(|account_id| {
            let enabled_regions = regions
                .iter()
                .filter(|region| {
                    region_accounts
                        .get(*region)
                        .is_some_and(|accounts| accounts.contains(&account_id))
                })
                .cloned()
                .collect();
            (account_id, enabled_regions)
        })
        .collect()
}
