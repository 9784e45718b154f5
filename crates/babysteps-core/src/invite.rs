//! Pending caregiver invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InviteId, ValidationError, define_str_enum};

define_str_enum!(
    /// Access level an invited caregiver would receive.
    Role, "role" {
        Admin => "admin",
        Member => "member",
        Viewer => "viewer",
    }
);

define_str_enum!(
    InviteStatus, "invite status" {
        Pending => "pending",
        Accepted => "accepted",
        Revoked => "revoked",
    }
);

/// A request to add a caregiver. Only ever created as `pending` locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub id: InviteId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub status: InviteStatus,
}

impl InviteRequest {
    /// Creates a pending invite. The email is trimmed and must not be empty.
    pub fn new(email: &str, role: Role, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        Ok(Self {
            id: InviteId::generate(),
            email: email.to_string(),
            role,
            created_at: now,
            status: InviteStatus::Pending,
        })
    }
}
