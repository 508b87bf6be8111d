//! Transparent handling of Douban's proof-of-work checkpoint.
//!
//! Douban sometimes answers a GET with a small page holding a challenge form instead of the
//! requested content. The form carries a token (`tok`), a challenge string (`cha`) and a
//! redirect value (`red`); the page script holds the difficulty. Posting back a nonce that
//! solves the challenge grants a cookie, after which the original url serves real content.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tokio::{sync::Mutex, task::spawn_blocking};
use tracing::{debug, info, warn};
use url::Url;

use crate::parse::create_selector;
use crate::request::{Page, Session};
use crate::solver::solve;
use crate::{Error, Result, CHALLENGE_FALLBACK_ACTION, DEFAULT_DIFFICULTY};

static RE_DIFFICULTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"difficulty\s*=\s*(\d+)").expect("valid difficulty regex"));

/// Only one solve runs at a time, process wide, however many fetches hit a checkpoint.
static SOLVE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Everything needed to answer one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeState {
    pub token: String,
    pub challenge: String,
    pub redirect: String,
    /// Absolute url the solution is posted to.
    pub action_url: String,
    pub difficulty: u32,
}

impl ChallengeState {
    /// Extracts the challenge from `page`.
    ///
    /// Returns `None` when the page is not a checkpoint, or when it looks like one but
    /// lacks any of the `tok`, `cha` or `red` inputs.
    pub fn extract(page: &Page) -> Result<Option<Self>> {
        if !is_checkpoint(&page.body) {
            return Ok(None);
        }

        let doc = Html::parse_document(&page.body);
        let input_value = |id: &str| -> Result<Option<String>> {
            let selector = create_selector(&format!(r#"input[id="{id}"]"#))?;
            Ok(doc
                .select(&selector)
                .next()
                .and_then(|input| input.value().attr("value"))
                .map(str::to_string))
        };

        let (Some(token), Some(challenge), Some(redirect)) =
            (input_value("tok")?, input_value("cha")?, input_value("red")?)
        else {
            return Ok(None);
        };

        let form_selector = create_selector(r#"form[id="sec"]"#)?;
        let action = doc
            .select(&form_selector)
            .next()
            .and_then(|form| form.value().attr("action"))
            .unwrap_or(CHALLENGE_FALLBACK_ACTION);
        let action_url = Url::parse(&page.url)?.join(action)?.to_string();

        let difficulty = RE_DIFFICULTY
            .captures(&page.body)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(DEFAULT_DIFFICULTY);

        Ok(Some(Self {
            token,
            challenge,
            redirect,
            action_url,
            difficulty,
        }))
    }
}

/// Both marker inputs present means the response is a checkpoint page.
pub fn is_checkpoint(body: &str) -> bool {
    body.contains(r#"id="cha""#) && body.contains(r#"id="tok""#)
}

/// GETs `url` and returns its HTML, getting past a checkpoint if one is served instead.
///
/// After a successful solve the original url is requested exactly once more and whatever
/// comes back is returned as is.
pub async fn fetch_page<S>(session: &S, url: &str) -> Result<String>
where
    S: Session + ?Sized,
{
    let page = session.get(url).await?;

    let state = match ChallengeState::extract(&page)? {
        Some(state) => state,
        None => {
            if is_checkpoint(&page.body) {
                // TODO: decide whether a malformed checkpoint should fail the fetch instead.
                warn!("{url} looks like a checkpoint but has no usable challenge form");
            }
            return Ok(page.body);
        }
    };

    info!(
        "Checkpoint on {url}, solving with difficulty {}",
        state.difficulty
    );
    submit_solution(session, &page.url, state).await?;

    let page = session.get(url).await?;
    Ok(page.body)
}

/// Solves `state` and posts the answer, holding the global solve lock throughout.
async fn submit_solution<S>(session: &S, page_url: &str, state: ChallengeState) -> Result<()>
where
    S: Session + ?Sized,
{
    let origin = Url::parse(page_url)?.origin().ascii_serialization();

    let _guard = SOLVE_LOCK.lock().await;

    let nonce = spawn_blocking({
        let challenge = state.challenge.clone();
        let difficulty = state.difficulty;
        move || solve(&challenge, difficulty)
    })
    .await?;
    debug!("Solved challenge with nonce {nonce}");

    let nonce = nonce.to_string();
    let form = [
        ("tok", state.token.as_str()),
        ("cha", state.challenge.as_str()),
        ("sol", nonce.as_str()),
        ("red", state.redirect.as_str()),
    ];
    let status = session
        .post_form(&state.action_url, &form, page_url, &origin)
        .await?;

    if !status.is_success() {
        return Err(Error::ChallengeSubmission {
            url: state.action_url,
            status: status.as_u16(),
        });
    }
    Ok(())
}
