use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::api::session::Session;
use crate::error::{CrmError, Result};
use crate::stores::category::CategoryStore;
use crate::stores::contact::{ContactStore, ContactSyncMode, ContactView};
use crate::stores::job::JobStore;
use crate::stores::template::TemplateStore;

pub const API_URL_ENV: &str = "PROPERTY_CRM_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppState {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub contact_sync: ContactSyncMode,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("com", "example", "PropertyCRM")?;
        Some(proj.config_dir().join("config.toml"))
    }

    /// Reads the config file if there is one, then applies the environment.
    /// A broken file is reported and replaced by defaults.
    pub fn load() -> Self {
        let mut state = match Self::config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("ignoring {}: {}", path.display(), e);
                Self::new()
            }),
            None => Self::new(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            state.base_url = url;
        }
        state
    }

    /// A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).map_err(|e| CrmError::Config(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(CrmError::Config(e.to_string())),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| CrmError::Config("no config directory on this platform".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrmError::Config(e.to_string()))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| CrmError::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| CrmError::Config(e.to_string()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// All stores over one shared client and session.
pub struct Crm {
    api: Arc<ApiClient>,
    pub categories: Arc<CategoryStore>,
    pub contacts: Arc<ContactStore>,
    pub templates: TemplateStore,
    pub jobs: JobStore,
}

impl Crm {
    pub fn new(api: ApiClient, mode: ContactSyncMode) -> Self {
        let api = Arc::new(api);
        let categories = Arc::new(CategoryStore::new(Arc::clone(&api)));
        let contacts = Arc::new(ContactStore::new(
            Arc::clone(&api),
            Arc::clone(&categories),
            mode,
        ));
        Self {
            templates: TemplateStore::new(Arc::clone(&api)),
            jobs: JobStore::new(Arc::clone(&api)),
            categories,
            contacts,
            api,
        }
    }

    pub fn from_state(state: &AppState) -> Result<Self> {
        if state.base_url.trim().is_empty() {
            return Err(CrmError::Config(format!(
                "no API url configured, set {API_URL_ENV} or pass --api-url"
            )));
        }
        let api = ApiClient::with_timeout(
            &state.base_url,
            Session::new(state.token.clone()),
            state.timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self::new(api, state.contact_sync))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn contact_view(&self) -> ContactView {
        ContactView::new(Arc::clone(&self.contacts))
    }
}
