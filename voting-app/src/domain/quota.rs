use serde::{Deserialize, Serialize};

/// Votes a single identity may cast per calendar day (UTC).
pub const DAILY_VOTE_ALLOWANCE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    pub identity_id: Option<uuid::Uuid>,
    pub remaining: u8,
}

impl DailyQuota {
    /// Signed out: nothing can be cast.
    pub fn signed_out() -> Self {
        Self {
            identity_id: None,
            remaining: 0,
        }
    }

    pub fn full(identity_id: uuid::Uuid) -> Self {
        Self {
            identity_id: Some(identity_id),
            remaining: DAILY_VOTE_ALLOWANCE,
        }
    }

    pub fn from_votes_cast(identity_id: uuid::Uuid, votes_cast: u32) -> Self {
        let remaining = u32::from(DAILY_VOTE_ALLOWANCE).saturating_sub(votes_cast) as u8;
        Self {
            identity_id: Some(identity_id),
            remaining,
        }
    }

    pub fn apply_delta(&mut self, delta: i8) {
        let next = (i16::from(self.remaining) + i16::from(delta))
            .clamp(0, i16::from(DAILY_VOTE_ALLOWANCE));
        self.remaining = next as u8;
    }

    pub fn can_vote(&self) -> bool {
        self.identity_id.is_some() && self.remaining > 0
    }
}
