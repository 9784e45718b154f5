//! Explicit caller context for operations that stamp ownership.

use crate::profile::BabyProfile;
use crate::types::{BabyId, CaregiverId};

/// The baby and caregiver an operation acts for.
///
/// Every logging and timer operation takes a `Session` instead of reading
/// process-wide state, so several babies can be driven side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub baby_id: BabyId,
    pub caregiver_id: CaregiverId,
}

impl Session {
    pub const fn new(baby_id: BabyId, caregiver_id: CaregiverId) -> Self {
        Self {
            baby_id,
            caregiver_id,
        }
    }

    /// Builds a session for the given profile.
    pub fn for_profile(profile: &BabyProfile, caregiver_id: CaregiverId) -> Self {
        Self::new(profile.id.clone(), caregiver_id)
    }
}
