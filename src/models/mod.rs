// Plain data layer for the lifecycle engine.
//
// These structs are persistence-agnostic: the gateway adapters map them to
// their own storage, and nothing here reaches back into a database.

pub mod actor;
pub mod note;
pub mod occurrence_link;
pub mod recurring_schedule;
pub mod service_request;
pub mod vendor_claim;

pub use actor::{Actor, ActorRole};
pub use note::{NewRequestNote, RequestNote};
pub use occurrence_link::OccurrenceLink;
pub use recurring_schedule::RecurringSchedule;
pub use service_request::{Cancellation, NewServiceRequest, Priority, ServiceRequest};
pub use vendor_claim::{ClaimStatus, VendorClaim};
