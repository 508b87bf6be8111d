use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape with is invalid. Selector: {0}")]
    MissingSelector(String),

    // Structural errors: the listing layout no longer looks like what we expect.
    #[error("No subject id found in detail url '{0}'")]
    MissingId(String),
    #[error("No title found for id {0}.")]
    MissingTitle(u64),
    #[error("No year found for id {id} ('{title}')")]
    MissingYear { id: u64, title: String },
    #[error("Unknown rating '{rating}' in: {title}")]
    UnknownRating { rating: String, title: String },
    #[error("Invalid rating date '{date}' in: {title}")]
    InvalidDate { date: String, title: String },
    #[error("Invalid page count '{0}' in the paginator")]
    InvalidPageCount(String),

    #[error("GET {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("Challenge submission to {url} failed with HTTP {status}")]
    ChallengeSubmission { url: String, status: u16 },

    #[error("Invalid JSON format in {}: expected a list.", .0.display())]
    InvalidFormat(PathBuf),
    #[error("Invalid rating {rating} for id {id} in {}", .path.display())]
    InvalidStoredRating { path: PathBuf, id: u64, rating: u8 },

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Url Error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}
