use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::utils::is_valid_phone;

pub type CategoryId = i64;
pub type ContactId = i64;
pub type TemplateId = i64;
pub type JobId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// How callers name a category scope. Both forms land in the same cache entry
/// once resolved against the category list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    Id(CategoryId),
    Name(String),
}

impl CategoryKey {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Self::Id(id) => category.id == *id,
            Self::Name(name) => category.name == *name,
        }
    }

    /// A name key with nothing in it cannot scope a fetch.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Name(name) if name.trim().is_empty())
    }
}

impl From<CategoryId> for CategoryKey {
    fn from(id: CategoryId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for CategoryKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<&Category> for CategoryKey {
    fn from(category: &Category) -> Self {
        Self::Id(category.id)
    }
}

impl FromStr for CategoryKey {
    type Err = std::convert::Infallible;

    /// Numbers (optionally written `#12`) are ids, anything else is a name.
    /// A `name:` prefix forces a name, for categories called e.g. "2024".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("name:") {
            return Ok(Self::Name(name.to_string()));
        }
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        Ok(match digits.parse::<CategoryId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "propertyInterest")]
    pub property_interest: Option<String>,
    pub category: Category,
}

impl Contact {
    /// Stored numbers are never rewritten; callers use this to flag them.
    pub fn has_valid_phone(&self) -> bool {
        is_valid_phone(&self.phone)
    }
}

/// Fields for a contact that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub property_interest: Option<String>,
    pub category: CategoryKey,
}

/// Partial contact update. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub property_interest: Option<String>,
    pub category: Option<CategoryKey>,
}

impl ContactPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn move_to(category: impl Into<CategoryKey>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }
}

/// Contact body as the server reads it, with the category already resolved.
#[derive(Debug, Serialize, Default, Clone, PartialEq)]
pub struct ContactPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "propertyInterest", skip_serializing_if = "Option::is_none")]
    pub property_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Serialize, Default, Clone)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Complete,
    Fail,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [Self::Pending, Self::Complete, Self::Fail];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Complete => "COMPLETE",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown job status `{s}` (PENDING, COMPLETE or FAIL)"))
    }
}

/// A recipient as the job recorded it when it was created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobRecipient {
    pub id: ContactId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub message: String,
    #[serde(default)]
    pub contacts: Vec<JobRecipient>,
    pub created_at: String,
}

impl Job {
    pub fn recipient_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    /// `None` when the server sent something that is not RFC 3339.
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }
}

/// What the server hands back when it accepts a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: Option<JobId>,
    pub recipient_count: usize,
}

#[derive(Debug, Serialize)]
pub struct NewJob<'a> {
    pub message: &'a str,
    pub contact_ids: &'a [ContactId],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_reads_camel_case_interest_and_nested_category() {
        let contact: Contact = serde_json::from_value(json!({
            "id": 7,
            "name": "Ana",
            "phone": "+6591234567",
            "propertyInterest": "3-room condo",
            "category": {"id": 1, "name": "Leads"}
        }))
        .unwrap();
        assert_eq!(contact.property_interest.as_deref(), Some("3-room condo"));
        assert_eq!(contact.email, None);
        assert_eq!(contact.category.name, "Leads");
        assert!(contact.has_valid_phone());
    }

    #[test]
    fn payload_skips_untouched_fields() {
        let payload = ContactPayload {
            category_id: Some(2),
            ..ContactPayload::default()
        };
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"category_id": 2}));
    }

    #[test]
    fn category_key_parses_ids_and_names() {
        assert_eq!("12".parse::<CategoryKey>().unwrap(), CategoryKey::Id(12));
        assert_eq!(
            "Leads".parse::<CategoryKey>().unwrap(),
            CategoryKey::Name("Leads".into())
        );
        assert_eq!("#12".parse::<CategoryKey>().unwrap(), CategoryKey::Id(12));
        assert!(CategoryKey::Name("  ".into()).is_blank());
        assert!(!CategoryKey::Id(0).is_blank());
    }

    #[test]
    fn numeric_category_names_need_the_name_prefix() {
        assert_eq!("2024".parse::<CategoryKey>().unwrap(), CategoryKey::Id(2024));
        assert_eq!(
            "name:2024".parse::<CategoryKey>().unwrap(),
            CategoryKey::Name("2024".into())
        );
        assert_eq!(
            "name:".parse::<CategoryKey>().unwrap(),
            CategoryKey::Name(String::new())
        );
    }

    #[test]
    fn category_key_matches_by_either_form() {
        let leads = Category {
            id: 1,
            name: "Leads".into(),
        };
        assert!(CategoryKey::Id(1).matches(&leads));
        assert!(CategoryKey::from("Leads").matches(&leads));
        assert!(!CategoryKey::from("Clients").matches(&leads));
    }

    #[test]
    fn job_status_uses_upper_case_on_the_wire() {
        assert_eq!(serde_json::to_value(JobStatus::Fail).unwrap(), json!("FAIL"));
        assert_eq!("pending".parse::<JobStatus>().unwrap(), JobStatus::Pending);
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn job_parses_created_at_when_rfc3339() {
        let job: Job = serde_json::from_value(json!({
            "id": 3,
            "status": "PENDING",
            "message": "Hello",
            "contacts": [{"id": 1, "name": "Ana", "phone": "+6591234567"}],
            "created_at": "2026-01-05T09:30:00+08:00"
        }))
        .unwrap();
        assert!(job.is_pending());
        assert_eq!(job.recipient_count(), 1);
        assert!(job.created().is_some());

        let odd = Job {
            created_at: "yesterday".into(),
            ..job
        };
        assert!(odd.created().is_none());
    }
}
