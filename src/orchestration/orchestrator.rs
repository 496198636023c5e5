//! # Service Request Orchestrator
//!
//! The engine's public surface. Wires the collaborator interfaces into the
//! per-use-case components and exposes one method per use case; every method
//! is one atomic unit of work whose outcome carries the notification intents
//! to dispatch after it returns.
//!
//! Construction is explicit: the embedder hands over the gateway and
//! collaborator implementations, there is no ambient registry.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::gateway::catalog::CatalogValidator;
use crate::gateway::invoicing::InvoiceCollaborator;
use crate::gateway::persistence::PersistenceGateway;
use crate::gateway::vendors::VendorDirectory;
use crate::models::{Actor, RequestNote};

use super::claim_processor::ClaimProcessor;
use super::request_editor::RequestEditor;
use super::request_finalizer::RequestFinalizer;
use super::request_initializer::RequestInitializer;
use super::types::{
    ApprovalDecision, ChildRequestCommand, CreateRequestCommand, EditRequestCommand,
    RequestOutcome,
};

/// Facade over the lifecycle use cases
pub struct ServiceRequestOrchestrator {
    initializer: RequestInitializer,
    editor: RequestEditor,
    claims: ClaimProcessor,
    finalizer: RequestFinalizer,
}

impl ServiceRequestOrchestrator {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        catalog: Arc<dyn CatalogValidator>,
        invoicing: Arc<dyn InvoiceCollaborator>,
        vendors: Arc<dyn VendorDirectory>,
    ) -> Self {
        Self::with_config(
            gateway,
            catalog,
            invoicing,
            vendors,
            EngineConfig::default(),
        )
    }

    pub fn with_config(
        gateway: Arc<dyn PersistenceGateway>,
        catalog: Arc<dyn CatalogValidator>,
        invoicing: Arc<dyn InvoiceCollaborator>,
        vendors: Arc<dyn VendorDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            initializer: RequestInitializer::new(
                Arc::clone(&gateway),
                Arc::clone(&catalog),
                Arc::clone(&vendors),
                &config,
            ),
            editor: RequestEditor::new(
                Arc::clone(&gateway),
                Arc::clone(&catalog),
                Arc::clone(&vendors),
                &config,
            ),
            claims: ClaimProcessor::new(
                Arc::clone(&gateway),
                Arc::clone(&vendors),
                Arc::clone(&invoicing),
            ),
            finalizer: RequestFinalizer::new(gateway, vendors, invoicing, &config),
        }
    }

    /// Create a top-level service request
    pub async fn create_request(
        &self,
        actor: Actor,
        command: CreateRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        self.initializer.create(actor, command).await
    }

    /// Create a follow-up request under a partially completed parent
    pub async fn create_child_request(
        &self,
        actor: Actor,
        command: ChildRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        self.initializer.create_child(actor, command).await
    }

    /// Edit a request; re-resolves distribution and recurrence as needed
    pub async fn edit_request(
        &self,
        actor: Actor,
        command: EditRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        self.editor.edit(actor, command).await
    }

    /// A vendor accepts a request; exactly one concurrent claimant wins
    pub async fn claim(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        self.claims.claim(actor, request_id).await
    }

    /// The assigned vendor (or an admin) returns a request to the pool
    pub async fn release_vendor(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.claims.release(actor, request_id).await
    }

    /// Cancel a request from any non-terminal state
    pub async fn cancel(
        &self,
        actor: Actor,
        request_id: i64,
        reason: Option<String>,
    ) -> EngineResult<RequestOutcome> {
        self.finalizer.cancel(actor, request_id, reason).await
    }

    /// Owner resolution of the approval track, exactly once
    pub async fn resolve_owner_approval(
        &self,
        actor: Actor,
        request_id: i64,
        decision: ApprovalDecision,
    ) -> EngineResult<RequestOutcome> {
        self.finalizer
            .resolve_approval(actor, request_id, decision)
            .await
    }

    /// The assigned vendor begins work
    pub async fn start_work(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        self.finalizer.start_work(actor, request_id).await
    }

    /// Gate further work on a deposit payment
    pub async fn require_deposit(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.finalizer.require_deposit(actor, request_id).await
    }

    /// External deposit-paid signal resumes gated work
    pub async fn record_deposit_paid(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.finalizer.record_deposit_paid(actor, request_id).await
    }

    /// Work ended successfully
    pub async fn complete(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        self.finalizer.complete(actor, request_id).await
    }

    /// Work ended with open items
    pub async fn complete_partially(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.finalizer.complete_partially(actor, request_id).await
    }

    /// Reword a note's text; the only note mutation there is
    pub async fn edit_note_text(
        &self,
        actor: Actor,
        note_id: i64,
        text: String,
    ) -> EngineResult<RequestNote> {
        self.finalizer.edit_note_text(actor, note_id, text).await
    }
}
