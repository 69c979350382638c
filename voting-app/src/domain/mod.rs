mod character;
mod identity;
mod quota;
mod rankings;
mod vote;

pub use character::{Character, CharacterId};
pub use identity::{AccessToken, Identity};
pub use quota::{DailyQuota, DAILY_VOTE_ALLOWANCE};
pub use rankings::{RankedCharacter, RankingsPage, DEFAULT_PER_PAGE};
pub(crate) use rankings::dedupe_by_id;
pub use vote::VoteReceipt;
