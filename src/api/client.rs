use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::models::{
    Category, CategoryId, Contact, ContactId, ContactPayload, Job, JobId, JobStatus, NewJob,
    NewTemplate, Template, TemplateId, TemplatePatch,
};
use crate::api::session::Session;
use crate::error::{CrmError, Result};
use crate::utils::normalize_url;

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// HTTP+JSON client for the Property CRM API. Holds no cached data.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        Self::with_timeout(base_url, session, None)
    }

    /// `timeout` of `None` keeps the transport default.
    pub fn with_timeout(
        base_url: &str,
        session: Session,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = normalize_url(base_url);
        Url::parse(&base_url)
            .map_err(|e| CrmError::Config(format!("bad API url `{base_url}`: {e}")))?;
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(t) = self.session.token() {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        req
    }

    /// Sends one request and maps the status onto [`CrmError`].
    /// A 204 or an empty body comes back as `None`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        debug!("{} {}", method, path);
        let mut req = self
            .with_auth(self.http.request(method, self.url(path)))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("{} rejected the credential, clearing session", path);
            self.session.clear();
            return Err(CrmError::Auth(if text.is_empty() {
                "session expired".into()
            } else {
                text
            }));
        }
        if status == StatusCode::CONFLICT {
            return Err(CrmError::Conflict(text));
        }
        if !status.is_success() {
            return Err(CrmError::Request {
                status: status.as_u16(),
                body: text,
            });
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let json = self
            .request(method, path, body.as_ref())
            .await?
            .ok_or(CrmError::EmptyResponse)?;
        Ok(serde_json::from_value(json)?)
    }

    /// Lists tolerate an empty body and treat it as nothing.
    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        match self.request(Method::GET, path, None).await? {
            Some(json) => Ok(serde_json::from_value(json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Exchanges username and password for a bearer token and stores it in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = serde_json::json!({ "username": username, "password": password });
        let resp = self
            .http
            .post(self.url("/property/login"))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CrmError::Auth("invalid credentials".into()));
        }
        let login: LoginResponse = serde_json::from_str(&resp.text().await?)?;
        self.session.set(login.token);
        info!("logged in as {}", username);
        Ok(())
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.fetch_list("/property/v1/category").await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let body = serde_json::json!({ "name": name });
        self.fetch(Method::POST, "/property/v1/category", Some(body)).await
    }

    pub async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let body = serde_json::json!({ "name": name });
        self.fetch(Method::PUT, &format!("/property/v1/category/{id}"), Some(body))
            .await
    }

    pub async fn contacts_by_category(&self, category_id: CategoryId) -> Result<Vec<Contact>> {
        self.fetch_list(&format!("/property/v1/contacts?category_id={category_id}"))
            .await
    }

    pub async fn create_contact(&self, payload: &ContactPayload) -> Result<Contact> {
        let body = serde_json::to_value(payload)?;
        self.fetch(Method::POST, "/property/v1/contact", Some(body)).await
    }

    pub async fn update_contact(&self, id: ContactId, payload: &ContactPayload) -> Result<Contact> {
        let body = serde_json::to_value(payload)?;
        self.fetch(Method::PUT, &format!("/property/v1/contact/{id}"), Some(body))
            .await
    }

    pub async fn delete_contact(&self, id: ContactId) -> Result<()> {
        self.delete(&format!("/property/v1/contact/{id}")).await
    }

    pub async fn templates(&self) -> Result<Vec<Template>> {
        self.fetch_list("/property/v1/templates").await
    }

    pub async fn create_template(&self, template: &NewTemplate) -> Result<Template> {
        let body = serde_json::to_value(template)?;
        self.fetch(Method::POST, "/property/v1/template", Some(body)).await
    }

    pub async fn update_template(&self, id: TemplateId, patch: &TemplatePatch) -> Result<Template> {
        let body = serde_json::to_value(patch)?;
        self.fetch(Method::PUT, &format!("/property/v1/template/{id}"), Some(body))
            .await
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<()> {
        self.delete(&format!("/property/v1/template/{id}")).await
    }

    /// The server may or may not echo the job back; only its id is kept.
    pub async fn create_job(&self, job: &NewJob<'_>) -> Result<Option<JobId>> {
        let body = serde_json::to_value(job)?;
        let resp = self
            .request(Method::POST, "/property/v1/job", Some(&body))
            .await?;
        Ok(resp.and_then(|json| json.get("id").and_then(Value::as_i64)))
    }

    pub async fn jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        match status {
            Some(status) => {
                self.fetch_list(&format!("/property/v1/jobs?status={status}"))
                    .await
            }
            None => self.fetch_list("/property/v1/jobs").await,
        }
    }

    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        self.delete(&format!("/property/v1/job/{id}")).await
    }
}
