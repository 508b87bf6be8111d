//! Exports a Douban user's movie ratings.
//!
//! The "collect" listing of a user is scraped page by page (getting past Douban's
//! proof-of-work checkpoint whenever it shows up), merged with what a previous run saved,
//! and written back out as JSON plus a Markdown overview.

mod error;
mod macros;

pub mod checkpoint;
pub mod parse;
pub mod process;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod request;
pub mod solver;
pub mod store;

pub use error::{Error, Result};
pub use process::{Progress, Scraper};
pub use reconcile::{reconcile, Merged};
pub use record::{Record, ResultSet};
pub use request::{HttpSession, Page, Session, SharedSession};

pub const DEFAULT_BASE_URL: &str = "https://movie.douban.com";
/// Items per listing page.
pub const PAGE_SIZE: usize = 15;
/// Listing pages fetched concurrently.
pub const WORKERS: usize = 5;
/// Used when a checkpoint page doesn't state its difficulty.
pub const DEFAULT_DIFFICULTY: u32 = 4;
/// Used when the checkpoint form has no `action`.
pub const CHALLENGE_FALLBACK_ACTION: &str = "/c";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "zh;q=0.8,en-US;q=0.5,en;q=0.3";
