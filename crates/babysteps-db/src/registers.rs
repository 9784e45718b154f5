//! Profile register and invite records.

use babysteps_core::{
    BabyProfile, InviteId, InviteRequest, PROFILE_KEY, ProfileUpdate, Role, ValidationError,
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::{Change, Collection, Database, DbError, format_timestamp, parse_timestamp};

/// The host's IANA zone name, falling back to `UTC`.
pub fn host_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "could not detect host time zone");
        "UTC".to_string()
    })
}

impl Database {
    /// Loads the profile, defaulting to the host zone when none is stored.
    pub fn load_profile(&self) -> Result<BabyProfile, DbError> {
        self.load_profile_or(BabyProfile::with_timezone(host_timezone()))
    }

    /// Loads the stored profile merged over `defaults`.
    pub fn load_profile_or(&self, defaults: BabyProfile) -> Result<BabyProfile, DbError> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM registers WHERE key = ?",
                [PROFILE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Ok(defaults);
        };
        let value: serde_json::Value =
            serde_json::from_str(&stored).map_err(|e| invalid_profile(&e))?;
        BabyProfile::merge_stored(defaults, &value).map_err(|e| invalid_profile(&e))
    }

    pub fn save_profile(&mut self, profile: &BabyProfile) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO registers (key, value) VALUES (?, ?)",
            params![PROFILE_KEY, serde_json::to_string(profile)?],
        )?;
        self.notify(&[Change::new(Collection::Profile, Some(profile.id.clone()))]);
        Ok(())
    }

    /// Merges `update` into the current profile and stores the result.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<BabyProfile, DbError> {
        let profile = update.apply(self.load_profile()?);
        self.save_profile(&profile)?;
        tracing::info!(baby_id = %profile.id, "updated profile");
        Ok(profile)
    }

    /// Records a pending invite for `email`.
    pub fn invite_caregiver(&mut self, email: &str, role: Role) -> Result<InviteRequest, DbError> {
        self.invite_caregiver_at(email, role, Utc::now())
    }

    pub fn invite_caregiver_at(
        &mut self,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<InviteRequest, DbError> {
        let invite = InviteRequest::new(email, role, now)?;
        self.conn.execute(
            "INSERT INTO invites (id, email, role, created_at, status) VALUES (?, ?, ?, ?, ?)",
            params![
                invite.id.as_str(),
                invite.email,
                invite.role.as_str(),
                format_timestamp(invite.created_at),
                invite.status.as_str(),
            ],
        )?;
        tracing::info!(invite_id = %invite.id, role = %role, "created invite");
        self.notify(&[Change::new(Collection::Invites, None)]);
        Ok(invite)
    }

    /// Lists invites, newest first.
    pub fn query_invites(&self) -> Result<Vec<InviteRequest>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, email, role, created_at, status
            FROM invites
            ORDER BY created_at DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut invites = Vec::new();
        for row in rows {
            let (id, email, role, created_at, status) = row?;
            let invalid = |e: ValidationError| DbError::InvalidRecord {
                id: id.clone(),
                message: e.to_string(),
            };
            invites.push(InviteRequest {
                id: InviteId::new(id.clone()).map_err(invalid)?,
                email,
                role: role.parse().map_err(invalid)?,
                created_at: parse_timestamp(&created_at, &id)?,
                status: status.parse().map_err(invalid)?,
            });
        }
        Ok(invites)
    }
}

fn invalid_profile(error: &serde_json::Error) -> DbError {
    DbError::InvalidRecord {
        id: PROFILE_KEY.to_string(),
        message: error.to_string(),
    }
}
