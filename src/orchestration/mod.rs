// Orchestration: one component per use-case family, composed behind the
// ServiceRequestOrchestrator facade. Every use case is a single unit of work;
// notification intents ride the outcome and are dispatched post-commit.

pub mod claim_processor;
pub mod occurrence_materializer;
pub mod orchestrator;
pub(crate) mod redistribution;
pub mod request_editor;
pub mod request_finalizer;
pub mod request_initializer;
pub mod types;

pub use claim_processor::ClaimProcessor;
pub use occurrence_materializer::{OccurrenceMaterializer, PrunedOccurrences};
pub use orchestrator::ServiceRequestOrchestrator;
pub use request_editor::RequestEditor;
pub use request_finalizer::RequestFinalizer;
pub use request_initializer::RequestInitializer;
pub use types::{
    ApprovalDecision, ChildRequestCommand, CreateRequestCommand, EditRequestCommand,
    RecurrenceChange, RequestOutcome,
};
