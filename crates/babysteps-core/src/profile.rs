//! The baby profile register record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::BabyId;

pub use crate::types::DEFAULT_BABY_ID;

/// Register key the profile is stored under.
pub const PROFILE_KEY: &str = "babysteps:baby";

/// Name used when no profile has been saved yet.
pub const DEFAULT_BABY_NAME: &str = "Baby";

/// The profile of the tracked baby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyProfile {
    pub id: BabyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    /// IANA zone name, e.g. `America/New_York`.
    pub timezone: String,
}

impl BabyProfile {
    /// The default profile in the given zone.
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            id: BabyId::default(),
            name: DEFAULT_BABY_NAME.to_string(),
            birthday: None,
            timezone: timezone.into(),
        }
    }

    /// Loads a stored profile, filling any missing field from `defaults`.
    pub fn merge_stored(
        defaults: Self,
        stored: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let partial: StoredProfile = serde_json::from_value(stored.clone())?;
        Ok(Self {
            id: partial.id.unwrap_or(defaults.id),
            name: partial.name.unwrap_or(defaults.name),
            birthday: partial.birthday.or(defaults.birthday),
            timezone: partial.timezone.unwrap_or(defaults.timezone),
        })
    }

    /// Age in whole days on `today`, if a birthday is known and not in the future.
    pub fn age_days(&self, today: NaiveDate) -> Option<i64> {
        self.birthday
            .map(|birthday| today.signed_duration_since(birthday).num_days())
            .filter(|days| *days >= 0)
    }
}

/// A register value where every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    id: Option<BabyId>,
    name: Option<String>,
    birthday: Option<NaiveDate>,
    timezone: Option<String>,
}

/// Partial update applied by the profile-update operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub timezone: Option<String>,
}

impl ProfileUpdate {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.birthday.is_none() && self.timezone.is_none()
    }

    /// Returns `profile` with every provided field replaced.
    #[must_use]
    pub fn apply(self, mut profile: BabyProfile) -> BabyProfile {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(birthday) = self.birthday {
            profile.birthday = Some(birthday);
        }
        if let Some(timezone) = self.timezone {
            profile.timezone = timezone;
        }
        profile
    }
}
