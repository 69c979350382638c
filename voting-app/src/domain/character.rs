use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Latin letters with diacritics that survive in portrait file names.
const PORTRAIT_ACCENTS: &str = "ÁáÄäÂâÉéÈèÊêËëÍíÌìÏïÎîÓóÒòÖöÔôÚúÙùÜüÛûÇçÑñÀà";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub i64);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub votes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Character {
    pub fn new(id: i64, name: impl Into<String>, votes: u32) -> Self {
        Self {
            id: CharacterId(id),
            name: name.into(),
            votes,
            image_url: None,
        }
    }

    /// Shift the displayed vote count, never below zero.
    pub fn apply_vote_delta(&mut self, delta: i64) {
        let next = (i64::from(self.votes) + delta).clamp(0, i64::from(u32::MAX));
        self.votes = next as u32;
    }

    /// Path of the bundled portrait, e.g. `Monkey D. Luffy` ->
    /// `/characters/monkey_d_luffy.png`.
    pub fn image_path(&self) -> String {
        let slug: String = self
            .name
            .to_lowercase()
            .replace(' ', "_")
            .chars()
            .filter(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '-') || PORTRAIT_ACCENTS.contains(*c)
            })
            .collect();
        format!("/characters/{slug}.png")
    }
}

/// Hosted rows may carry `votes: null` for characters nobody voted for yet.
fn null_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}
