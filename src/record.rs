use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One rated movie.
///
/// Optional fields are never written out empty: they are omitted from the JSON instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Douban subject id, taken from the `/subject/<id>/` detail url.
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_zh: Option<String>,
    pub year: u16,
    /// `1..=5` stars, `0` when the movie is marked as seen but unrated.
    pub rating: u8,
    /// `YYYY-MM-DD`
    pub rated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Records scraped during one run, keyed by subject id, in listing order.
pub type ResultSet = IndexMap<u64, Record>;
