use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Coordinates of a catalog entry: what is being requested, where, and under
/// which tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRef {
    pub franchise_id: i64,
    pub property_id: i64,
    pub service_type_id: i64,
}

/// Eligibility verdict for a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// The service type is active for the property
    pub service_active: bool,
    /// Guests may book this service type
    pub guest_bookable: bool,
    /// The property's membership covers the service type
    pub membership_valid: bool,
}

impl Eligibility {
    /// Enforce eligibility for a create/edit, guest-aware
    pub fn ensure_for(&self, catalog: &CatalogRef, is_guest: bool) -> EngineResult<()> {
        if !self.service_active {
            return Err(EngineError::validation(format!(
                "service type {} is not active for property {}",
                catalog.service_type_id, catalog.property_id
            )));
        }
        if !self.membership_valid {
            return Err(EngineError::validation(format!(
                "property {} has no valid membership for service type {}",
                catalog.property_id, catalog.service_type_id
            )));
        }
        if is_guest && !self.guest_bookable {
            return Err(EngineError::validation(format!(
                "service type {} is not bookable by guests",
                catalog.service_type_id
            )));
        }
        Ok(())
    }
}

/// Tenant/catalog configuration lookup, consulted before Create/Edit commit.
/// Lives outside the engine; a failed lookup is a dependency failure.
#[async_trait]
pub trait CatalogValidator: Send + Sync {
    async fn eligibility(&self, catalog: &CatalogRef) -> EngineResult<Eligibility>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: CatalogRef = CatalogRef {
        franchise_id: 1,
        property_id: 10,
        service_type_id: 100,
    };

    #[test]
    fn test_fully_eligible() {
        let eligibility = Eligibility {
            service_active: true,
            guest_bookable: true,
            membership_valid: true,
        };
        assert!(eligibility.ensure_for(&CATALOG, true).is_ok());
        assert!(eligibility.ensure_for(&CATALOG, false).is_ok());
    }

    #[test]
    fn test_guest_gate_only_applies_to_guests() {
        let eligibility = Eligibility {
            service_active: true,
            guest_bookable: false,
            membership_valid: true,
        };
        assert!(eligibility.ensure_for(&CATALOG, false).is_ok());
        assert!(matches!(
            eligibility.ensure_for(&CATALOG, true),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_inactive_service_rejected() {
        let eligibility = Eligibility {
            service_active: false,
            guest_bookable: true,
            membership_valid: true,
        };
        assert!(matches!(
            eligibility.ensure_for(&CATALOG, false),
            Err(EngineError::Validation(_))
        ));
    }
}
