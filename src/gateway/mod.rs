// Collaborator interfaces and their shipped adapters.
//
// The engine owns no wire protocol or storage format; everything external is
// reached through these traits. Constructor wiring is explicit — there is no
// ambient registry or framework-managed singleton.

pub mod catalog;
pub mod invoicing;
pub mod memory;
pub mod persistence;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod vendors;

pub use catalog::{CatalogRef, CatalogValidator, Eligibility};
pub use invoicing::{InvoiceCollaborator, InvoiceTrigger};
pub use memory::InMemoryGateway;
pub use persistence::{PersistenceGateway, StoredRequest, UnitOfWork};
#[cfg(feature = "postgres")]
pub use postgres::PostgresGateway;
pub use vendors::{VendorContact, VendorDirectory};
