#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Steward Core
//!
//! The service-request lifecycle engine of the Steward property-services
//! platform: a status state machine, a vendor-distribution resolver, a
//! recurring-occurrence projector, and the transactional orchestration binding
//! them together.
//!
//! ## Architecture
//!
//! The crate is a library invoked by an out-of-scope transport layer. Every
//! use case (create / edit / claim / release / cancel / approve / progress)
//! runs as one atomic unit of work over an explicit persistence gateway and
//! returns the outbound notification intents to dispatch after commit.
//!
//! - [`state_machine`] - pure transition planning plus identity guards
//! - [`distribution`] - vendor distribution strategies and candidate resolution
//! - [`recurrence`] - deterministic occurrence-date projection
//! - [`orchestration`] - transactional use cases behind one facade
//! - [`gateway`] - collaborator interfaces and the shipped adapters
//!   (in-memory, PostgreSQL via SQLx)
//! - [`events`] - notification intents and best-effort dispatch
//! - [`models`] - plain data structures for the aggregate and its rows
//! - [`error`] - the stable five-kind error taxonomy
//! - [`config`] - engine configuration
//!
//! ## Concurrency
//!
//! Writes to one aggregate are serialized by the gateway's version guard: of N
//! concurrent claims on a request, exactly one commits; the rest surface
//! `StateConflict`. Notification dispatch never participates in atomicity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use steward_core::gateway::InMemoryGateway;
//! use steward_core::orchestration::ServiceRequestOrchestrator;
//! # use steward_core::gateway::{CatalogValidator, InvoiceCollaborator, VendorDirectory};
//!
//! # fn wire(
//! #     catalog: Arc<dyn CatalogValidator>,
//! #     invoicing: Arc<dyn InvoiceCollaborator>,
//! #     vendors: Arc<dyn VendorDirectory>,
//! # ) -> ServiceRequestOrchestrator {
//! let gateway = Arc::new(InMemoryGateway::new());
//! ServiceRequestOrchestrator::new(gateway, catalog, invoicing, vendors)
//! # }
//! ```

pub mod config;
pub mod distribution;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod recurrence;
pub mod state_machine;

pub use config::EngineConfig;
pub use distribution::{DistributionPlan, DistributionType};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use models::{Actor, ActorRole, Priority, ServiceRequest};
pub use orchestration::ServiceRequestOrchestrator;
pub use recurrence::{RecurrenceRule, RecurrenceUnit};
pub use state_machine::{OwnerApprovalStatus, RequestStatus};
