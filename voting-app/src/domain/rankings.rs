use super::Character;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PER_PAGE: usize = 50;
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCharacter {
    pub rank: usize,
    pub character: Character,
}

/// One page of the full leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingsPage {
    pub entries: Vec<RankedCharacter>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl RankingsPage {
    /// Slice an already-ordered board. Pages are 1-based; ranks are global.
    pub fn from_board(board: &[Character], page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let total = board.len();
        let total_pages = total.div_ceil(per_page);
        let start = (page - 1).saturating_mul(per_page);

        let entries = board
            .iter()
            .enumerate()
            .skip(start)
            .take(per_page)
            .map(|(index, character)| RankedCharacter {
                rank: index + 1,
                character: character.clone(),
            })
            .collect();

        Self {
            entries,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Drop repeated ids, keeping the first (highest-ranked) occurrence.
pub(crate) fn dedupe_by_id(characters: Vec<Character>) -> Vec<Character> {
    let mut seen = HashSet::new();
    characters
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect()
}
