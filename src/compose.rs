use crate::api::models::{
    Category, CategoryId, Contact, ContactId, JobHandle, Template, TemplateId,
};
use crate::error::{CrmError, Result};
use crate::stores::category::CategorySelection;
use crate::stores::contact::ContactStore;
use crate::stores::job::JobStore;

const PREVIEW_NAMES: usize = 5;

/// Bulk message being written for one category.
#[derive(Debug, Default, Clone)]
pub struct MessageComposer {
    selection: CategorySelection,
    template: Option<TemplateId>,
    pub message: String,
}

impl MessageComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_categories(&mut self, categories: &[Category]) -> Option<CategoryId> {
        self.selection.observe(categories)
    }

    pub fn select_category(&mut self, id: CategoryId) {
        self.selection.select(id);
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.selection.selected()
    }

    /// Replaces the message with the template's content.
    pub fn apply_template(&mut self, template: &Template) {
        self.template = Some(template.id);
        self.message = template.content.clone();
    }

    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    pub fn char_count(&self) -> usize {
        self.message.chars().count()
    }

    pub fn can_send(&self, recipients: &[Contact]) -> bool {
        !self.message.trim().is_empty() && !recipients.is_empty()
    }

    /// Contacts of the selected category; nothing selected means nobody.
    pub async fn recipients(&self, contacts: &ContactStore) -> Result<Vec<Contact>> {
        match self.selection.key() {
            Some(key) => contacts.list(&key).await,
            None => Ok(Vec::new()),
        }
    }

    /// Creates a job for everyone in the selected category right now. Later
    /// edits to those contacts do not reach the job.
    pub async fn send(&mut self, contacts: &ContactStore, jobs: &JobStore) -> Result<JobHandle> {
        let key = self
            .selection
            .key()
            .ok_or_else(|| CrmError::validation("select a recipient category first"))?;
        let recipients = snapshot_recipients(&contacts.list(&key).await?);
        let handle = jobs.create(&self.message, &recipients).await?;
        self.message.clear();
        self.template = None;
        Ok(handle)
    }
}

pub fn snapshot_recipients(contacts: &[Contact]) -> Vec<ContactId> {
    contacts.iter().map(|c| c.id).collect()
}

/// Short human list of who will receive the message.
pub fn recipient_preview(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts in this category".to_string();
    }
    let names: Vec<&str> = contacts
        .iter()
        .take(PREVIEW_NAMES)
        .map(|c| c.name.as_str())
        .collect();
    let mut preview = names.join(", ");
    if contacts.len() > PREVIEW_NAMES {
        preview.push('…');
    }
    preview
}
