use super::ports::RemoteData;
use crate::domain::{dedupe_by_id, Character, RankingsPage};
use voting_errors::AppError;

/// Upper bound on rows pulled for the full leaderboard.
pub const RANKINGS_LIMIT: usize = 3000;

/// Snapshot of the whole leaderboard, sliced into pages on demand.
#[derive(Debug, Clone, Default)]
pub struct Rankings {
    board: Vec<Character>,
}

impl Rankings {
    pub async fn load(remote: &dyn RemoteData) -> Result<Self, AppError> {
        let rows = remote.rankings(RANKINGS_LIMIT).await?;
        let fetched = rows.len();
        let board = dedupe_by_id(rows);
        if board.len() != fetched {
            tracing::debug!("Dropped {} duplicate ranking rows", fetched - board.len());
        }
        Ok(Self { board })
    }

    pub fn page(&self, page: usize, per_page: usize) -> RankingsPage {
        RankingsPage::from_board(&self.board, page, per_page)
    }

    pub fn len(&self) -> usize {
        self.board.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_empty()
    }
}
