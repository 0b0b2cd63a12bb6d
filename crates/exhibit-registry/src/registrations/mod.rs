//! Exhibition registration: the four-step participant workflow, commissioner
//! notices, staff review, and the catalog and data exports.

pub mod countries;
pub mod domain;
pub mod export;
pub mod forms;
pub mod import;
mod memory;
pub mod notify;
pub mod printout;
pub mod report;
pub mod router;
mod sqlite;
pub mod store;
pub mod validation;
pub mod workflow;

pub use import::{seed_federations, seed_federations_from_path, FederationImportError};
pub use memory::MemoryRecordStore;
pub use notify::{MailTransport, MemoryOutbox, NotificationDispatcher, OutgoingMail};
pub use report::{CatalogExtras, CatalogReport, ReportMode};
pub use router::{registration_router, RegistrationApi};
pub use sqlite::SqliteRecordStore;
pub use store::{RecordStore, StoreError};
pub use workflow::{RegistrationWorkflow, Step, WorkflowError};

#[cfg(test)]
mod tests;
