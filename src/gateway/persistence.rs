//! # Persistence Gateway
//!
//! The engine's only write boundary. A use case obtains one [`UnitOfWork`],
//! performs every read and staged write through it, and commits once; dropping
//! an uncommitted unit of work discards all of its writes. Aggregate updates
//! carry the version observed at load time, and a mismatch at write or commit
//! time is a `StateConflict` — this is what serializes concurrent claims to
//! exactly one winner.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::models::{
    NewRequestNote, NewServiceRequest, OccurrenceLink, RecurringSchedule, RequestNote,
    ServiceRequest, VendorClaim,
};

/// A loaded aggregate plus the version its unit of work observed
#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub request: ServiceRequest,
    pub version: i64,
}

/// Factory for units of work
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>>;
}

/// One transactional scope over the aggregate and its related rows.
///
/// `delete_requests` cascades to the victims' claim rows, notes, and
/// occurrence links; nothing else cascades implicitly.
#[async_trait]
pub trait UnitOfWork: Send {
    // -- service requests ---------------------------------------------------

    async fn find_request(&mut self, id: i64) -> EngineResult<Option<StoredRequest>>;

    async fn insert_request(&mut self, new_request: NewServiceRequest)
        -> EngineResult<StoredRequest>;

    /// Write the aggregate back, guarded by `stored.version`. A lost race
    /// surfaces as `StateConflict`, either here or at commit.
    async fn update_request(&mut self, stored: &StoredRequest) -> EngineResult<()>;

    async fn delete_requests(&mut self, ids: &[i64]) -> EngineResult<()>;

    async fn children_of(&mut self, parent_id: i64) -> EngineResult<Vec<ServiceRequest>>;

    // -- vendor claim rows --------------------------------------------------

    async fn claim_rows(&mut self, request_id: i64) -> EngineResult<Vec<VendorClaim>>;

    /// Atomically replace the live claim rows with the resolved candidate set
    async fn replace_claim_rows(&mut self, request_id: i64, vendor_ids: &[i64])
        -> EngineResult<()>;

    async fn delete_claim_rows(&mut self, request_id: i64) -> EngineResult<()>;

    // -- recurring schedules ------------------------------------------------

    async fn schedule_for(&mut self, request_id: i64) -> EngineResult<Option<RecurringSchedule>>;

    async fn put_schedule(&mut self, schedule: &RecurringSchedule) -> EngineResult<()>;

    async fn delete_schedule(&mut self, request_id: i64) -> EngineResult<()>;

    // -- occurrence links ---------------------------------------------------

    async fn links_for(&mut self, main_request_id: i64) -> EngineResult<Vec<OccurrenceLink>>;

    async fn insert_links(&mut self, links: &[OccurrenceLink]) -> EngineResult<()>;

    async fn delete_links(
        &mut self,
        main_request_id: i64,
        occurrence_dates: &[NaiveDate],
    ) -> EngineResult<()>;

    // -- notes ----------------------------------------------------------------

    async fn insert_note(&mut self, note: NewRequestNote) -> EngineResult<RequestNote>;

    async fn find_note(&mut self, note_id: i64) -> EngineResult<Option<RequestNote>>;

    async fn update_note_text(&mut self, note_id: i64, text: &str) -> EngineResult<()>;

    // -- transaction boundary -----------------------------------------------

    async fn commit(self: Box<Self>) -> EngineResult<()>;

    async fn rollback(self: Box<Self>) -> EngineResult<()>;
}
