use std::sync::Arc;

use log::info;

use crate::api::client::ApiClient;
use crate::api::models::{NewTemplate, Template, TemplateId, TemplatePatch};
use crate::cache::ScopedCache;
use crate::error::{CrmError, Result};

pub struct TemplateStore {
    api: Arc<ApiClient>,
    cache: ScopedCache<(), Template>,
}

impl TemplateStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            cache: ScopedCache::new(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Template>> {
        if let Some(templates) = self.cache.get(&()) {
            return Ok(templates);
        }
        let ticket = self.cache.begin_fetch(());
        let templates = self.api.templates().await?;
        self.cache.complete_fetch(ticket, templates.clone());
        Ok(templates)
    }

    pub async fn get(&self, id: TemplateId) -> Result<Template> {
        self.list()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CrmError::validation(format!("unknown template {id}")))
    }

    pub async fn create(&self, template: NewTemplate) -> Result<Template> {
        if template.name.trim().is_empty() || template.content.trim().is_empty() {
            return Err(CrmError::validation("template needs a name and content"));
        }
        let _guard = self.cache.lock_scope(&()).await;
        let created = self.api.create_template(&template).await?;
        info!("created template {} ({})", created.name, created.id);
        self.cache.invalidate(&());
        Ok(created)
    }

    pub async fn update(&self, id: TemplateId, patch: TemplatePatch) -> Result<Template> {
        let _guard = self.cache.lock_scope(&()).await;
        let updated = self.api.update_template(id, &patch).await?;
        info!("updated template {}", id);
        self.cache.invalidate(&());
        Ok(updated)
    }

    pub async fn delete(&self, id: TemplateId) -> Result<()> {
        let _guard = self.cache.lock_scope(&()).await;
        self.api.delete_template(id).await?;
        info!("deleted template {}", id);
        self.cache.invalidate(&());
        Ok(())
    }
}

/// Editable copy of a template, or of a template that does not exist yet.
/// Editing the draft never touches the cached list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    selected: Option<TemplateId>,
    pub name: String,
    pub content: String,
}

impl TemplateDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, template: &Template) {
        self.selected = Some(template.id);
        self.name = template.name.clone();
        self.content = template.content.clone();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn selected(&self) -> Option<TemplateId> {
        self.selected
    }

    pub fn is_new(&self) -> bool {
        self.selected.is_none()
    }

    /// Creates or updates depending on whether a template is selected.
    pub async fn save(&self, store: &TemplateStore) -> Result<Template> {
        match self.selected {
            None => {
                store
                    .create(NewTemplate {
                        name: self.name.clone(),
                        content: self.content.clone(),
                    })
                    .await
            }
            Some(id) => {
                store
                    .update(
                        id,
                        TemplatePatch {
                            name: Some(self.name.clone()),
                            content: Some(self.content.clone()),
                        },
                    )
                    .await
            }
        }
    }
}
