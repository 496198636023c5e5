//! # In-Memory Persistence Gateway
//!
//! Reference implementation of [`PersistenceGateway`] over a single
//! `parking_lot` store. Writes are buffered per unit of work and applied under
//! one write lock at commit, after every staged aggregate update has its
//! expected version re-checked against the store — so concurrent units of
//! work observe the same exactly-one-winner semantics as the SQL adapter, and
//! an uncommitted unit of work leaves no trace.
//!
//! Used by the test suites and by embedders that want the engine without a
//! database.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    NewRequestNote, NewServiceRequest, OccurrenceLink, RecurringSchedule, RequestNote,
    ServiceRequest, VendorClaim,
};

use super::persistence::{PersistenceGateway, StoredRequest, UnitOfWork};

#[derive(Debug, Clone)]
struct VersionedRequest {
    request: ServiceRequest,
    version: i64,
}

#[derive(Debug, Default)]
struct StoreInner {
    requests: HashMap<i64, VersionedRequest>,
    claims: HashMap<i64, Vec<VendorClaim>>,
    schedules: HashMap<i64, RecurringSchedule>,
    links: Vec<OccurrenceLink>,
    notes: BTreeMap<i64, RequestNote>,
}

#[derive(Debug)]
struct Store {
    inner: RwLock<StoreInner>,
    request_seq: AtomicI64,
    note_seq: AtomicI64,
}

/// Gateway handle; clones share the same store
#[derive(Debug, Clone)]
pub struct InMemoryGateway {
    store: Arc<Store>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Store {
                inner: RwLock::new(StoreInner::default()),
                request_seq: AtomicI64::new(1),
                note_seq: AtomicI64::new(1),
            }),
        }
    }

    /// Committed snapshot of one aggregate, for assertions and read paths
    pub fn request_snapshot(&self, id: i64) -> Option<ServiceRequest> {
        self.store
            .inner
            .read()
            .requests
            .get(&id)
            .map(|versioned| versioned.request.clone())
    }

    /// Committed claim rows of one aggregate
    pub fn claim_snapshot(&self, request_id: i64) -> Vec<VendorClaim> {
        self.store
            .inner
            .read()
            .claims
            .get(&request_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Committed occurrence links of one template
    pub fn link_snapshot(&self, main_request_id: i64) -> Vec<OccurrenceLink> {
        self.store
            .inner
            .read()
            .links
            .iter()
            .filter(|link| link.main_request_id == main_request_id)
            .cloned()
            .collect()
    }

    /// Committed notes of one aggregate, in insertion order
    pub fn note_snapshot(&self, request_id: i64) -> Vec<RequestNote> {
        self.store
            .inner
            .read()
            .notes
            .values()
            .filter(|note| note.service_request_id == request_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            store: Arc::clone(&self.store),
            ops: Vec::new(),
        }))
    }
}

/// Staged write operations, applied in order at commit
#[derive(Debug, Clone)]
enum WriteOp {
    InsertRequest(ServiceRequest),
    UpdateRequest {
        request: ServiceRequest,
        expected_version: i64,
    },
    DeleteRequests(Vec<i64>),
    ReplaceClaims {
        request_id: i64,
        rows: Vec<VendorClaim>,
    },
    DeleteClaims {
        request_id: i64,
    },
    PutSchedule(RecurringSchedule),
    DeleteSchedule(i64),
    InsertLinks(Vec<OccurrenceLink>),
    DeleteLinks {
        main_request_id: i64,
        occurrence_dates: Vec<NaiveDate>,
    },
    InsertNote(RequestNote),
    UpdateNoteText {
        note_id: i64,
        text: String,
    },
}

struct MemoryUnitOfWork {
    store: Arc<Store>,
    ops: Vec<WriteOp>,
}

impl MemoryUnitOfWork {
    fn next_request_id(&self) -> i64 {
        // Sequence allocation is not transactional; gaps on rollback are fine
        self.store.request_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn next_note_id(&self) -> i64 {
        self.store.note_seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_request(&mut self, id: i64) -> EngineResult<Option<StoredRequest>> {
        Ok(self
            .store
            .inner
            .read()
            .requests
            .get(&id)
            .map(|versioned| StoredRequest {
                request: versioned.request.clone(),
                version: versioned.version,
            }))
    }

    async fn insert_request(
        &mut self,
        new_request: NewServiceRequest,
    ) -> EngineResult<StoredRequest> {
        let now = Utc::now();
        let request = ServiceRequest {
            id: self.next_request_id(),
            franchise_id: new_request.franchise_id,
            property_id: new_request.property_id,
            service_type_id: new_request.service_type_id,
            owner_id: new_request.owner_id,
            vendor_id: None,
            status: new_request.status,
            owner_approval: new_request.owner_approval,
            distribution_type: new_request.distribution_type,
            priority: new_request.priority,
            description: new_request.description,
            scheduled_start: new_request.scheduled_start,
            scheduled_end: new_request.scheduled_end,
            parent_id: new_request.parent_id,
            is_discrepancy: new_request.is_discrepancy,
            is_guest: new_request.is_guest,
            is_guest_concierge: new_request.is_guest_concierge,
            is_recurring: new_request.is_recurring,
            is_turn_over: new_request.is_turn_over,
            linen_detail: new_request.linen_detail,
            cancellation: None,
            invoice_id: None,
            created_by: new_request.created_by,
            created_at: now,
            updated_at: now,
        };
        self.ops.push(WriteOp::InsertRequest(request.clone()));
        Ok(StoredRequest {
            request,
            version: 1,
        })
    }

    async fn update_request(&mut self, stored: &StoredRequest) -> EngineResult<()> {
        self.ops.push(WriteOp::UpdateRequest {
            request: stored.request.clone(),
            expected_version: stored.version,
        });
        Ok(())
    }

    async fn delete_requests(&mut self, ids: &[i64]) -> EngineResult<()> {
        if !ids.is_empty() {
            self.ops.push(WriteOp::DeleteRequests(ids.to_vec()));
        }
        Ok(())
    }

    async fn children_of(&mut self, parent_id: i64) -> EngineResult<Vec<ServiceRequest>> {
        Ok(self
            .store
            .inner
            .read()
            .requests
            .values()
            .filter(|versioned| versioned.request.parent_id == Some(parent_id))
            .map(|versioned| versioned.request.clone())
            .collect())
    }

    async fn claim_rows(&mut self, request_id: i64) -> EngineResult<Vec<VendorClaim>> {
        Ok(self
            .store
            .inner
            .read()
            .claims
            .get(&request_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_claim_rows(
        &mut self,
        request_id: i64,
        vendor_ids: &[i64],
    ) -> EngineResult<()> {
        let rows = vendor_ids
            .iter()
            .map(|&vendor_id| VendorClaim::new(request_id, vendor_id))
            .collect();
        self.ops.push(WriteOp::ReplaceClaims { request_id, rows });
        Ok(())
    }

    async fn delete_claim_rows(&mut self, request_id: i64) -> EngineResult<()> {
        self.ops.push(WriteOp::DeleteClaims { request_id });
        Ok(())
    }

    async fn schedule_for(&mut self, request_id: i64) -> EngineResult<Option<RecurringSchedule>> {
        Ok(self.store.inner.read().schedules.get(&request_id).cloned())
    }

    async fn put_schedule(&mut self, schedule: &RecurringSchedule) -> EngineResult<()> {
        self.ops.push(WriteOp::PutSchedule(schedule.clone()));
        Ok(())
    }

    async fn delete_schedule(&mut self, request_id: i64) -> EngineResult<()> {
        self.ops.push(WriteOp::DeleteSchedule(request_id));
        Ok(())
    }

    async fn links_for(&mut self, main_request_id: i64) -> EngineResult<Vec<OccurrenceLink>> {
        Ok(self
            .store
            .inner
            .read()
            .links
            .iter()
            .filter(|link| link.main_request_id == main_request_id)
            .cloned()
            .collect())
    }

    async fn insert_links(&mut self, links: &[OccurrenceLink]) -> EngineResult<()> {
        if !links.is_empty() {
            self.ops.push(WriteOp::InsertLinks(links.to_vec()));
        }
        Ok(())
    }

    async fn delete_links(
        &mut self,
        main_request_id: i64,
        occurrence_dates: &[NaiveDate],
    ) -> EngineResult<()> {
        if !occurrence_dates.is_empty() {
            self.ops.push(WriteOp::DeleteLinks {
                main_request_id,
                occurrence_dates: occurrence_dates.to_vec(),
            });
        }
        Ok(())
    }

    async fn insert_note(&mut self, note: NewRequestNote) -> EngineResult<RequestNote> {
        let stored = RequestNote {
            id: self.next_note_id(),
            service_request_id: note.service_request_id,
            status_before: note.status_before,
            status_after: note.status_after,
            author: note.author,
            text: note.text,
            media: note.media,
            created_at: Utc::now(),
        };
        self.ops.push(WriteOp::InsertNote(stored.clone()));
        Ok(stored)
    }

    async fn find_note(&mut self, note_id: i64) -> EngineResult<Option<RequestNote>> {
        Ok(self.store.inner.read().notes.get(&note_id).cloned())
    }

    async fn update_note_text(&mut self, note_id: i64, text: &str) -> EngineResult<()> {
        self.ops.push(WriteOp::UpdateNoteText {
            note_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let mut inner = self.store.inner.write();

        // Verify every staged aggregate update against the live versions
        // before any write lands; a conflict aborts the whole unit of work.
        for op in &self.ops {
            if let WriteOp::UpdateRequest {
                request,
                expected_version,
            } = op
            {
                match inner.requests.get(&request.id) {
                    Some(current) if current.version == *expected_version => {}
                    Some(current) => {
                        return Err(EngineError::state_conflict(format!(
                            "service request {} was modified concurrently (expected version {}, found {})",
                            request.id, expected_version, current.version
                        )));
                    }
                    None => {
                        return Err(EngineError::state_conflict(format!(
                            "service request {} no longer exists",
                            request.id
                        )));
                    }
                }
            }
        }

        for op in self.ops {
            apply(&mut inner, op);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        // Nothing was applied; dropping the staged ops is the rollback
        Ok(())
    }
}

fn apply(inner: &mut StoreInner, op: WriteOp) {
    match op {
        WriteOp::InsertRequest(request) => {
            inner.requests.insert(
                request.id,
                VersionedRequest {
                    request,
                    version: 1,
                },
            );
        }
        WriteOp::UpdateRequest {
            mut request,
            expected_version,
        } => {
            request.updated_at = Utc::now();
            inner.requests.insert(
                request.id,
                VersionedRequest {
                    request,
                    version: expected_version + 1,
                },
            );
        }
        WriteOp::DeleteRequests(ids) => {
            for id in &ids {
                inner.requests.remove(id);
                inner.claims.remove(id);
                inner.schedules.remove(id);
            }
            inner
                .links
                .retain(|link| !ids.contains(&link.generated_request_id));
            inner
                .notes
                .retain(|_, note| !ids.contains(&note.service_request_id));
        }
        WriteOp::ReplaceClaims { request_id, rows } => {
            inner.claims.insert(request_id, rows);
        }
        WriteOp::DeleteClaims { request_id } => {
            inner.claims.remove(&request_id);
        }
        WriteOp::PutSchedule(schedule) => {
            inner
                .schedules
                .insert(schedule.service_request_id, schedule);
        }
        WriteOp::DeleteSchedule(request_id) => {
            inner.schedules.remove(&request_id);
        }
        WriteOp::InsertLinks(links) => {
            inner.links.extend(links);
        }
        WriteOp::DeleteLinks {
            main_request_id,
            occurrence_dates,
        } => {
            inner.links.retain(|link| {
                link.main_request_id != main_request_id
                    || !occurrence_dates.contains(&link.occurrence_date)
            });
        }
        WriteOp::InsertNote(note) => {
            inner.notes.insert(note.id, note);
        }
        WriteOp::UpdateNoteText { note_id, text } => {
            if let Some(note) = inner.notes.get_mut(&note_id) {
                note.text = Some(text);
            }
        }
    }
}
