//! Core domain model for jobsink.

use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "jobsink-core";

/// A persisted job posting. `id` is assigned by the store; `job_id` is the
/// provider-supplied natural key and is unique across all stored rows.
///
/// Every textual field defaults to the empty string when the provider omits
/// it, so consumers never branch on a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub description: String,
    pub date_posted: String,
    pub job_type: String,
    pub salary: String,
    pub benefits: String,
    pub application_link: String,
    pub related_links: String,
    pub job_id: String,
}

/// A job posting as mapped from one raw provider item, before it has been
/// accepted by the store. Same shape as [`Job`] minus the surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobDraft {
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub description: String,
    pub date_posted: String,
    pub job_type: String,
    pub salary: String,
    pub benefits: String,
    pub application_link: String,
    pub related_links: String,
    pub job_id: String,
}

/// Partial update for a stored job. `None` fields are left untouched.
/// The natural key is addressed by the update call itself and cannot be
/// patched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub date_posted: Option<String>,
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub benefits: Option<String>,
    pub application_link: Option<String>,
    pub related_links: Option<String>,
}
