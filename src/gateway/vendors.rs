use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// A vendor plus the contact channels notification intents carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorContact {
    pub vendor_id: i64,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

impl VendorContact {
    pub fn new(vendor_id: i64) -> Self {
        Self {
            vendor_id,
            emails: Vec::new(),
            phones: Vec::new(),
        }
    }
}

/// Read-only vendor resolution.
///
/// Preferred vendors are pre-ranked per (property, service type, franchise);
/// qualified vendors are the open-pool candidates for a (service type,
/// franchise) pair. Ranking and qualification rules live outside the engine.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    async fn preferred_vendors(
        &self,
        property_id: i64,
        service_type_id: i64,
        franchise_id: i64,
    ) -> EngineResult<Vec<VendorContact>>;

    async fn is_qualified(
        &self,
        vendor_id: i64,
        service_type_id: i64,
        franchise_id: i64,
    ) -> EngineResult<bool>;

    /// Contact details for an explicit vendor set, in the given order
    async fn contacts(&self, vendor_ids: &[i64]) -> EngineResult<Vec<VendorContact>>;
}
