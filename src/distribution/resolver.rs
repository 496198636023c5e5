//! # Vendor Distribution Resolver
//!
//! Decides which strategy a service request is distributed under, the status
//! it starts (or re-enters) the claim window with, and the exact candidate set
//! whose claim rows must exist. Resolution is a pure function over the
//! explicit vendor list and the preferred-vendor lookup result; the caller
//! fetches the latter from the vendor directory.
//!
//! The resolved candidate set is authoritative: the orchestrator replaces the
//! live claim rows with it atomically whenever distribution changes, so the
//! row set never drifts from the strategy.

use crate::state_machine::states::RequestStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four distribution strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    /// One explicitly chosen vendor
    SelectedVendor,
    /// An explicit set; first claim wins
    MultipleVendors,
    /// The property's pre-ranked vendor list for this service type
    PreferredVendor,
    /// Open pool: every qualified vendor in the franchise may self-claim
    DistributeToAllVendors,
}

impl DistributionType {
    /// Open-pool strategies carry no claim rows; vendors qualify at claim time
    pub fn is_open_pool(&self) -> bool {
        matches!(self, Self::DistributeToAllVendors)
    }
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectedVendor => write!(f, "selected_vendor"),
            Self::MultipleVendors => write!(f, "multiple_vendors"),
            Self::PreferredVendor => write!(f, "preferred_vendor"),
            Self::DistributeToAllVendors => write!(f, "distribute_to_all_vendors"),
        }
    }
}

impl std::str::FromStr for DistributionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selected_vendor" => Ok(Self::SelectedVendor),
            "multiple_vendors" => Ok(Self::MultipleVendors),
            "preferred_vendor" => Ok(Self::PreferredVendor),
            "distribute_to_all_vendors" => Ok(Self::DistributeToAllVendors),
            _ => Err(format!("Invalid distribution type: {s}")),
        }
    }
}

/// Outcome of strategy resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub distribution_type: DistributionType,
    /// Status the request holds while this plan's claim window is open
    pub initial_status: RequestStatus,
    /// Vendors whose claim rows must exist, in offer order
    pub candidates: Vec<i64>,
}

impl DistributionPlan {
    /// The distribution invariant: Claimed iff the candidate set is non-empty
    pub fn is_consistent(&self) -> bool {
        (self.initial_status == RequestStatus::Claimed) == !self.candidates.is_empty()
    }
}

/// Resolve the strategy for an explicit vendor list and a preferred lookup.
///
/// `preferred` is consulted only when `explicit` is empty, matching the order
/// of precedence: explicit choice, then the property's preferred list, then
/// the open pool.
pub fn resolve(explicit: &[i64], preferred: &[i64]) -> DistributionPlan {
    let explicit = dedup_preserving_order(explicit);

    match explicit.len() {
        1 => DistributionPlan {
            distribution_type: DistributionType::SelectedVendor,
            initial_status: RequestStatus::Claimed,
            candidates: explicit,
        },
        n if n > 1 => DistributionPlan {
            distribution_type: DistributionType::MultipleVendors,
            initial_status: RequestStatus::Claimed,
            candidates: explicit,
        },
        _ => {
            let preferred = dedup_preserving_order(preferred);
            if preferred.is_empty() {
                DistributionPlan {
                    distribution_type: DistributionType::DistributeToAllVendors,
                    initial_status: RequestStatus::NotYetAssigned,
                    candidates: Vec::new(),
                }
            } else {
                DistributionPlan {
                    distribution_type: DistributionType::PreferredVendor,
                    initial_status: RequestStatus::Claimed,
                    candidates: preferred,
                }
            }
        }
    }
}

/// Candidates present in `next` but not in `previous` — the only vendors
/// notified when distribution changes on edit.
pub fn newly_offered(previous: &[i64], next: &[i64]) -> Vec<i64> {
    next.iter()
        .copied()
        .filter(|vendor_id| !previous.contains(vendor_id))
        .collect()
}

fn dedup_preserving_order(vendor_ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    vendor_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_explicit_vendor() {
        let plan = resolve(&[7], &[]);
        assert_eq!(plan.distribution_type, DistributionType::SelectedVendor);
        assert_eq!(plan.initial_status, RequestStatus::Claimed);
        assert_eq!(plan.candidates, vec![7]);
        assert!(plan.is_consistent());
    }

    #[test]
    fn test_multiple_explicit_vendors() {
        let plan = resolve(&[3, 9, 3], &[]);
        assert_eq!(plan.distribution_type, DistributionType::MultipleVendors);
        assert_eq!(plan.candidates, vec![3, 9], "duplicates collapse, order kept");
        assert!(plan.is_consistent());
    }

    #[test]
    fn test_preferred_vendors_win_over_open_pool() {
        let plan = resolve(&[], &[3, 9]);
        assert_eq!(plan.distribution_type, DistributionType::PreferredVendor);
        assert_eq!(plan.initial_status, RequestStatus::Claimed);
        assert_eq!(plan.candidates, vec![3, 9]);
    }

    #[test]
    fn test_open_pool_has_no_candidates() {
        let plan = resolve(&[], &[]);
        assert_eq!(
            plan.distribution_type,
            DistributionType::DistributeToAllVendors
        );
        assert_eq!(plan.initial_status, RequestStatus::NotYetAssigned);
        assert!(plan.candidates.is_empty());
        assert!(plan.is_consistent());
        assert!(plan.distribution_type.is_open_pool());
    }

    #[test]
    fn test_explicit_list_ignores_preferred() {
        let plan = resolve(&[7], &[3, 9]);
        assert_eq!(plan.distribution_type, DistributionType::SelectedVendor);
        assert_eq!(plan.candidates, vec![7]);
    }

    #[test]
    fn test_newly_offered_diff() {
        assert_eq!(newly_offered(&[3, 9], &[7]), vec![7]);
        assert_eq!(newly_offered(&[3, 9], &[9, 11]), vec![11]);
        assert!(newly_offered(&[3], &[3]).is_empty());
        assert_eq!(newly_offered(&[], &[1, 2]), vec![1, 2]);
    }

    #[test]
    fn test_distribution_type_round_trip() {
        for dt in [
            DistributionType::SelectedVendor,
            DistributionType::MultipleVendors,
            DistributionType::PreferredVendor,
            DistributionType::DistributeToAllVendors,
        ] {
            assert_eq!(dt.to_string().parse::<DistributionType>().unwrap(), dt);
        }
    }
}
