//! Category-scoped sync client for the Property CRM API.
//!
//! Stores keep local collections of categories, contacts, templates and jobs
//! consistent with the server across create, update, reassign and delete.

pub mod api;
pub mod app;
pub mod cache;
pub mod compose;
pub mod error;
pub mod stores;
pub mod utils;

pub use api::client::ApiClient;
pub use api::models::{
    Category, CategoryId, CategoryKey, Contact, ContactId, ContactPatch, Job, JobHandle, JobId,
    JobStatus, NewContact, NewTemplate, Template, TemplateId, TemplatePatch,
};
pub use api::session::Session;
pub use app::{AppState, Crm};
pub use cache::LoadState;
pub use compose::MessageComposer;
pub use error::{CrmError, Result};
pub use stores::contact::{ContactSyncMode, ContactView};
