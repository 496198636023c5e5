//! Shared fixtures: stub collaborators and a wired test world over the
//! in-memory gateway.

// Not every test binary exercises every fixture
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use steward_core::error::{EngineError, EngineResult};
use steward_core::gateway::{
    CatalogRef, CatalogValidator, Eligibility, InMemoryGateway, InvoiceCollaborator,
    InvoiceTrigger, VendorContact, VendorDirectory,
};
use steward_core::models::{Priority, ServiceRequest};
use steward_core::orchestration::{CreateRequestCommand, ServiceRequestOrchestrator};

/// Catalog stub returning one fixed eligibility verdict
pub struct StaticCatalog {
    pub eligibility: Eligibility,
}

impl StaticCatalog {
    pub fn eligible() -> Self {
        Self {
            eligibility: Eligibility {
                service_active: true,
                guest_bookable: true,
                membership_valid: true,
            },
        }
    }
}

#[async_trait]
impl CatalogValidator for StaticCatalog {
    async fn eligibility(&self, _catalog: &CatalogRef) -> EngineResult<Eligibility> {
        Ok(self.eligibility)
    }
}

/// Directory stub with a fixed preferred list and qualification set
pub struct StaticDirectory {
    pub preferred: Vec<i64>,
    /// `None` means every vendor qualifies for the open pool
    pub qualified: Option<HashSet<i64>>,
}

impl StaticDirectory {
    pub fn empty() -> Self {
        Self {
            preferred: Vec::new(),
            qualified: None,
        }
    }

    pub fn with_preferred(preferred: Vec<i64>) -> Self {
        Self {
            preferred,
            qualified: None,
        }
    }
}

#[async_trait]
impl VendorDirectory for StaticDirectory {
    async fn preferred_vendors(
        &self,
        _property_id: i64,
        _service_type_id: i64,
        _franchise_id: i64,
    ) -> EngineResult<Vec<VendorContact>> {
        Ok(self
            .preferred
            .iter()
            .map(|&vendor_id| VendorContact::new(vendor_id))
            .collect())
    }

    async fn is_qualified(
        &self,
        vendor_id: i64,
        _service_type_id: i64,
        _franchise_id: i64,
    ) -> EngineResult<bool> {
        Ok(self
            .qualified
            .as_ref()
            .map_or(true, |set| set.contains(&vendor_id)))
    }

    async fn contacts(&self, vendor_ids: &[i64]) -> EngineResult<Vec<VendorContact>> {
        Ok(vendor_ids
            .iter()
            .map(|&vendor_id| VendorContact {
                vendor_id,
                emails: vec![format!("vendor{vendor_id}@example.com")],
                phones: Vec::new(),
            })
            .collect())
    }
}

/// Invoicing stub handing out sequential ids and recording linkage resets
pub struct RecordingInvoicing {
    next_id: AtomicI64,
    pub fail: AtomicBool,
    pub reset_calls: Mutex<Vec<(i64, Option<i64>)>>,
    pub triggers: Mutex<Vec<(i64, InvoiceTrigger)>>,
}

impl RecordingInvoicing {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(9000),
            fail: AtomicBool::new(false),
            reset_calls: Mutex::new(Vec::new()),
            triggers: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InvoiceCollaborator for RecordingInvoicing {
    async fn invoice_for(
        &self,
        request: &ServiceRequest,
        trigger: InvoiceTrigger,
    ) -> EngineResult<Option<i64>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::dependency("invoicing unavailable".to_string()));
        }
        self.triggers.lock().push((request.id, trigger));
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn reset_linkage(&self, request_id: i64, invoice_id: Option<i64>) -> EngineResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::dependency("invoicing unavailable".to_string()));
        }
        self.reset_calls.lock().push((request_id, invoice_id));
        Ok(())
    }
}

/// A fully wired engine over the in-memory gateway
pub struct TestWorld {
    pub gateway: Arc<InMemoryGateway>,
    pub orchestrator: Arc<ServiceRequestOrchestrator>,
    pub invoicing: Arc<RecordingInvoicing>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_directory(StaticDirectory::empty())
    }

    pub fn with_preferred(preferred: Vec<i64>) -> Self {
        Self::with_directory(StaticDirectory::with_preferred(preferred))
    }

    pub fn with_directory(directory: StaticDirectory) -> Self {
        let gateway = Arc::new(InMemoryGateway::new());
        let invoicing = Arc::new(RecordingInvoicing::new());
        let orchestrator = Arc::new(ServiceRequestOrchestrator::new(
            gateway.clone(),
            Arc::new(StaticCatalog::eligible()),
            invoicing.clone(),
            Arc::new(directory),
        ));
        Self {
            gateway,
            orchestrator,
            invoicing,
        }
    }

    pub fn request(&self, id: i64) -> ServiceRequest {
        self.gateway
            .request_snapshot(id)
            .expect("request should exist")
    }

    pub fn claim_vendor_ids(&self, request_id: i64) -> Vec<i64> {
        self.gateway
            .claim_snapshot(request_id)
            .iter()
            .map(|row| row.vendor_id)
            .collect()
    }
}

pub fn monday_9am() -> DateTime<Utc> {
    // 2024-01-01 is a Monday
    DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Baseline create command: owner 5, open-ended distribution, two-hour window
pub fn create_command() -> CreateRequestCommand {
    let start = monday_9am();
    CreateRequestCommand {
        franchise_id: 1,
        property_id: 10,
        service_type_id: 100,
        owner_id: 5,
        priority: Priority::Medium,
        description: Some("Cleaning".to_string()),
        scheduled_start: start,
        scheduled_end: start + Duration::hours(2),
        explicit_vendor_ids: Vec::new(),
        is_guest: false,
        is_guest_concierge: false,
        is_turn_over: false,
        linen_detail: None,
        media: Vec::new(),
        note_text: None,
        recurrence: None,
    }
}
