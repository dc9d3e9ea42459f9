use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::api::models::{
    Category, CategoryId, CategoryKey, Contact, ContactId, ContactPatch, ContactPayload,
    NewContact,
};
use crate::cache::{ActiveScope, LoadState, ScopedCache};
use crate::error::{CrmError, Result};
use crate::stores::category::CategoryStore;
use crate::utils::{is_valid_phone, search};

/// What a successful contact create does to the local cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSyncMode {
    /// Drop the category's collection and let the next read fetch it.
    #[default]
    Invalidate,
    /// Prepend the new contact into an already loaded collection.
    Patch,
}

/// Contacts, one category at a time. Cache scopes are category ids, so a key
/// given by name and a key given by id share the same entry.
pub struct ContactStore {
    api: Arc<ApiClient>,
    categories: Arc<CategoryStore>,
    cache: ScopedCache<CategoryId, Contact>,
    mode: ContactSyncMode,
}

impl ContactStore {
    pub fn new(
        api: Arc<ApiClient>,
        categories: Arc<CategoryStore>,
        mode: ContactSyncMode,
    ) -> Self {
        Self {
            api,
            categories,
            cache: ScopedCache::new(),
            mode,
        }
    }

    async fn scope(&self, key: &CategoryKey) -> Result<CategoryId> {
        if let CategoryKey::Id(id) = key {
            return Ok(*id);
        }
        Ok(self.categories.resolve(key).await?.id)
    }

    pub async fn list(&self, key: &CategoryKey) -> Result<Vec<Contact>> {
        Ok(self.list_scoped(key).await?.1)
    }

    /// Like [`list`](Self::list), also reporting the cache scope the key resolved to.
    async fn list_scoped(&self, key: &CategoryKey) -> Result<(CategoryId, Vec<Contact>)> {
        if key.is_blank() {
            return Err(CrmError::validation("a category is required to list contacts"));
        }
        let scope = self.scope(key).await?;
        if let Some(contacts) = self.cache.get(&scope) {
            return Ok((scope, contacts));
        }
        Ok((scope, self.fetch(scope).await?))
    }

    pub async fn refresh(&self, key: &CategoryKey) -> Result<Vec<Contact>> {
        let scope = self.scope(key).await?;
        self.fetch(scope).await
    }

    async fn fetch(&self, scope: CategoryId) -> Result<Vec<Contact>> {
        let ticket = self.cache.begin_fetch(scope);
        let mut contacts = self.api.contacts_by_category(scope).await?;
        contacts.retain(|c| c.category.id == scope);
        debug!("fetched {} contacts for category {}", contacts.len(), scope);
        self.cache.complete_fetch(ticket, contacts.clone());
        Ok(contacts)
    }

    pub async fn create(&self, data: NewContact) -> Result<Contact> {
        validate_name(&data.name)?;
        validate_phone(&data.phone)?;
        let category = self.categories.resolve(&data.category).await?;

        let _guard = self.cache.lock_scope(&category.id).await;
        let payload = ContactPayload {
            name: Some(data.name.trim().to_string()),
            phone: Some(data.phone),
            email: data.email.filter(|e| !e.is_empty()),
            property_interest: data.property_interest.filter(|p| !p.is_empty()),
            category_id: Some(category.id),
        };
        let created = self.api.create_contact(&payload).await?;
        info!("created contact {} in category {}", created.id, created.category.id);

        let scope = created.category.id;
        let patched = self.mode == ContactSyncMode::Patch
            && self.cache.is_fresh(&scope)
            && self.cache.patch(&scope, |contacts| contacts.insert(0, created.clone()));
        if !patched {
            self.cache.invalidate(&scope);
        }
        Ok(created)
    }

    /// Partial update as seen from the `view` scope.
    ///
    /// When the returned contact no longer belongs to the viewed category it is
    /// dropped from that collection and the destination is invalidated.
    /// Otherwise the cached entry is replaced where it stands.
    pub async fn update(
        &self,
        view: &CategoryKey,
        id: ContactId,
        patch: ContactPatch,
    ) -> Result<Contact> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(phone) = &patch.phone {
            validate_phone(phone)?;
        }
        let view_scope = self.scope(view).await?;
        let target = match &patch.category {
            Some(key) => Some(self.categories.resolve(key).await?.id),
            None => None,
        };

        let mut scopes = vec![view_scope];
        scopes.extend(target);
        let _guards = self.cache.lock_scopes(&scopes).await;

        let payload = ContactPayload {
            name: patch.name.map(|n| n.trim().to_string()),
            phone: patch.phone,
            email: patch.email,
            property_interest: patch.property_interest,
            category_id: target,
        };
        let updated = self.api.update_contact(id, &payload).await?;

        if updated.category.id != view_scope {
            info!(
                "contact {} moved from category {} to {}",
                id, view_scope, updated.category.id
            );
            self.cache.patch(&view_scope, |contacts| contacts.retain(|c| c.id != id));
            self.cache.invalidate(&updated.category.id);
        } else {
            self.cache.patch(&view_scope, |contacts| {
                if let Some(slot) = contacts.iter_mut().find(|c| c.id == id) {
                    *slot = updated.clone();
                }
            });
        }
        Ok(updated)
    }

    pub async fn reassign(
        &self,
        view: &CategoryKey,
        id: ContactId,
        to: CategoryKey,
    ) -> Result<Contact> {
        self.update(view, id, ContactPatch::move_to(to)).await
    }

    /// The caller is expected to have confirmed the deletion already.
    pub async fn delete(&self, view: &CategoryKey, id: ContactId) -> Result<()> {
        let scope = self.scope(view).await?;
        let _guard = self.cache.lock_scope(&scope).await;
        self.api.delete_contact(id).await?;
        info!("deleted contact {}", id);
        self.cache.patch(&scope, |contacts| contacts.retain(|c| c.id != id));
        Ok(())
    }

    /// Renames a category and rewrites the embedded category of every
    /// contact cached under it, so no cached contact keeps the old name.
    pub async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let _guard = self.cache.lock_scope(&id).await;
        let renamed = self.categories.rename(id, name).await?;
        self.cache.patch(&id, |contacts| {
            for contact in contacts.iter_mut().filter(|c| c.category.id == id) {
                contact.category = renamed.clone();
            }
        });
        Ok(renamed)
    }

    pub async fn invalidate(&self, key: &CategoryKey) -> Result<()> {
        let scope = self.scope(key).await?;
        self.cache.invalidate(&scope);
        Ok(())
    }

    /// Whatever is held for `scope`, fresh or not.
    fn cached(&self, scope: CategoryId) -> Option<Vec<Contact>> {
        self.cache.peek(&scope)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CrmError::validation("contact name cannot be empty"));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<()> {
    if !is_valid_phone(phone) {
        return Err(CrmError::validation(format!(
            "invalid phone number `{phone}`, use +XXXXXXXX format"
        )));
    }
    Ok(())
}

/// A contact list bound to whichever category is selected. Loads that finish
/// after the selection moved on are thrown away.
///
/// Once loaded, the view reads through to the store's cache for its scope,
/// so store mutations (a reassignment, a delete, an in-place update) show up
/// here without another fetch.
pub struct ContactView {
    store: Arc<ContactStore>,
    scope: ActiveScope<CategoryKey>,
    shown: Mutex<Shown>,
}

/// The last settled state and the cache scope it was loaded from.
struct Shown {
    state: LoadState<Contact>,
    scope: Option<CategoryId>,
}

impl Shown {
    fn new(state: LoadState<Contact>) -> Self {
        Self { state, scope: None }
    }
}

impl ContactView {
    pub fn new(store: Arc<ContactStore>) -> Self {
        Self {
            store,
            scope: ActiveScope::default(),
            shown: Mutex::new(Shown::new(LoadState::Idle)),
        }
    }

    pub fn select(&self, key: Option<CategoryKey>) {
        let next = if key.is_some() {
            LoadState::Loading
        } else {
            LoadState::Idle
        };
        self.scope.select(key);
        self.set_shown(Shown::new(next));
    }

    pub fn selected(&self) -> Option<CategoryKey> {
        self.scope.current().0
    }

    /// Loads the selected scope. Without a selection nothing is fetched.
    pub async fn load(&self) -> LoadState<Contact> {
        let (key, epoch) = self.scope.current();
        let Some(key) = key else {
            return LoadState::Idle;
        };
        let next = match self.store.list_scoped(&key).await {
            Ok((scope, contacts)) => Shown {
                state: LoadState::Ready(contacts),
                scope: Some(scope),
            },
            Err(e) => Shown::new(LoadState::Failed(e.to_string())),
        };
        if !self.scope.is_current(epoch) {
            debug!("selection moved away from {} during load, dropping result", key);
            return self.state();
        }
        self.set_shown(next);
        self.state()
    }

    pub fn state(&self) -> LoadState<Contact> {
        let shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        match (&shown.state, shown.scope) {
            (LoadState::Ready(_), Some(scope)) => self
                .store
                .cached(scope)
                .map(LoadState::Ready)
                .unwrap_or_else(|| shown.state.clone()),
            (state, _) => state.clone(),
        }
    }

    fn set_shown(&self, next: Shown) {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Search over what is loaded; the stored list is left untouched.
    pub fn filtered(&self, query: &str) -> Vec<Contact> {
        let state = self.state();
        search(state.items(), query).into_iter().cloned().collect()
    }
}
