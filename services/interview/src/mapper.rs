//! Wire ⇄ persisted conversions.
//!
//! Every function here is pure. User-supplied fields are copied verbatim;
//! image URLs and timestamps are passed in by the caller, never derived.

use crate::record_store::{InterviewExperience, NewInterviewExperience};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-editable fields of a post, as submitted by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRequest {
    pub user_name: String,
    pub user_email: String,
    pub title: String,
    pub content: String,
    pub company_tag: String,
}

/// A post as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceResponse {
    pub id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub title: String,
    pub content: String,
    pub company_tag: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Build an unsaved record stamped with `stamped_at` for both timestamps
pub fn to_new_record(
    request: ExperienceRequest,
    image_url: Option<String>,
    stamped_at: DateTime<Utc>,
) -> NewInterviewExperience {
    NewInterviewExperience {
        user_name: request.user_name,
        user_email: request.user_email,
        title: request.title,
        content: request.content,
        company_tag: request.company_tag,
        image_url,
        created_at: stamped_at,
        updated_at: stamped_at,
    }
}

/// Overwrite the user-editable fields of an existing record
pub fn apply_request(record: &mut InterviewExperience, request: ExperienceRequest) {
    record.user_name = request.user_name;
    record.user_email = request.user_email;
    record.title = request.title;
    record.content = request.content;
    record.company_tag = request.company_tag;
}

/// The user-editable fields of a record
pub fn to_request(record: &InterviewExperience) -> ExperienceRequest {
    ExperienceRequest {
        user_name: record.user_name.clone(),
        user_email: record.user_email.clone(),
        title: record.title.clone(),
        content: record.content.clone(),
        company_tag: record.company_tag.clone(),
    }
}

impl From<InterviewExperience> for ExperienceResponse {
    fn from(r: InterviewExperience) -> Self {
        Self {
            id: r.id,
            user_name: r.user_name,
            user_email: r.user_email,
            title: r.title,
            content: r.content,
            company_tag: r.company_tag,
            image_url: r.image_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<ExperienceResponse> for InterviewExperience {
    fn from(r: ExperienceResponse) -> Self {
        Self {
            id: r.id,
            user_name: r.user_name,
            user_email: r.user_email,
            title: r.title,
            content: r.content,
            company_tag: r.company_tag,
            image_url: r.image_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
