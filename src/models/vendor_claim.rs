use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a vendor claim row. Rows exist only while the request awaits a
/// claim, so the live set carries a single status today; the column is kept
/// explicit because the row is an audit-visible record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// The vendor holds first right to claim the request
    Claimed,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claimed => write!(f, "claimed"),
        }
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claimed" => Ok(Self::Claimed),
            _ => Err(format!("Invalid claim status: {s}")),
        }
    }
}

/// "Vendor X has first right to claim service request Y."
///
/// Invariant: the live row set for a request equals exactly the resolved
/// candidate set of its current distribution strategy. Rows are deleted when a
/// vendor claims, when distribution changes, and when the request leaves the
/// claim window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorClaim {
    pub service_request_id: i64,
    pub vendor_id: i64,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

impl VendorClaim {
    pub fn new(service_request_id: i64, vendor_id: i64) -> Self {
        Self {
            service_request_id,
            vendor_id,
            status: ClaimStatus::Claimed,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claim_row() {
        let row = VendorClaim::new(42, 7);
        assert_eq!(row.service_request_id, 42);
        assert_eq!(row.vendor_id, 7);
        assert_eq!(row.status, ClaimStatus::Claimed);
    }

    #[test]
    fn test_claim_status_round_trip() {
        assert_eq!("claimed".parse::<ClaimStatus>().unwrap(), ClaimStatus::Claimed);
        assert_eq!(ClaimStatus::Claimed.to_string(), "claimed");
    }
}
