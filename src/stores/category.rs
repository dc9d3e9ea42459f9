use std::sync::Arc;

use log::info;

use crate::api::client::ApiClient;
use crate::api::models::{Category, CategoryId, CategoryKey};
use crate::cache::ScopedCache;
use crate::error::{CrmError, Result};

/// Owns the category id → name mapping.
pub struct CategoryStore {
    api: Arc<ApiClient>,
    cache: ScopedCache<(), Category>,
}

impl CategoryStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            cache: ScopedCache::new(),
        }
    }

    /// Cached list, fetched on first use and after any invalidation.
    /// An empty list is a normal answer.
    pub async fn list(&self) -> Result<Vec<Category>> {
        if let Some(categories) = self.cache.get(&()) {
            return Ok(categories);
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Vec<Category>> {
        let ticket = self.cache.begin_fetch(());
        let categories = self.api.categories().await?;
        self.cache.complete_fetch(ticket, categories.clone());
        Ok(categories)
    }

    pub async fn create(&self, name: &str) -> Result<Category> {
        let name = clean_name(name)?;
        let _guard = self.cache.lock_scope(&()).await;
        let category = self.api.create_category(name).await?;
        info!("created category {} ({})", category.name, category.id);
        self.cache.invalidate(&());
        Ok(category)
    }

    /// Contacts embed their category, so callers go through
    /// [`ContactStore::rename_category`](crate::stores::contact::ContactStore::rename_category).
    pub(crate) async fn rename(&self, id: CategoryId, name: &str) -> Result<Category> {
        let name = clean_name(name)?;
        let _guard = self.cache.lock_scope(&()).await;
        let category = self.api.update_category(id, name).await?;
        info!("renamed category {} to {}", id, category.name);
        self.cache.invalidate(&());
        Ok(category)
    }

    /// Looks a key up in the (possibly freshly fetched) list.
    pub async fn resolve(&self, key: &CategoryKey) -> Result<Category> {
        if key.is_blank() {
            return Err(CrmError::validation("a category is required"));
        }
        self.list()
            .await?
            .into_iter()
            .find(|c| key.matches(c))
            .ok_or_else(|| CrmError::validation(format!("unknown category {key}")))
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }
}

fn clean_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CrmError::validation("category name cannot be empty"));
    }
    Ok(name)
}

/// Which category a picker has selected. The first category is picked
/// automatically only while nothing is selected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategorySelection {
    selected: Option<CategoryId>,
}

impl CategorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<CategoryId> {
        self.selected
    }

    pub fn select(&mut self, id: CategoryId) {
        self.selected = Some(id);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Feeds the latest list in and returns the resulting selection.
    pub fn observe(&mut self, categories: &[Category]) -> Option<CategoryId> {
        if self.selected.is_none() {
            self.selected = categories.first().map(|c| c.id);
        }
        self.selected
    }

    pub fn key(&self) -> Option<CategoryKey> {
        self.selected.map(CategoryKey::Id)
    }
}
