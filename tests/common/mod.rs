#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use douban_export::{Error, Page, Result, Session};
use reqwest::StatusCode;

/// A challenge form posted to the fake.
#[derive(Debug, Clone)]
pub struct Post {
    pub url: String,
    pub form: HashMap<String, String>,
    pub referer: String,
    pub origin: String,
}

/// `Session` serving canned pages and recording every call.
///
/// Each url has a queue of responses; the last one keeps being served once the others are
/// used up. Unknown urls answer 404.
pub struct FakeSession {
    responses: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<Post>>,
    post_status: u16,
    delay: Option<Duration>,
    gets_in_flight: AtomicUsize,
    max_gets_in_flight: AtomicUsize,
    posts_in_flight: AtomicUsize,
    max_posts_in_flight: AtomicUsize,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            responses: Mutex::default(),
            gets: Mutex::default(),
            posts: Mutex::default(),
            post_status: 200,
            delay: None,
            gets_in_flight: AtomicUsize::new(0),
            max_gets_in_flight: AtomicUsize::new(0),
            posts_in_flight: AtomicUsize::new(0),
            max_posts_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_post_status(mut self, status: u16) -> Self {
        self.post_status = status;
        self
    }

    /// Every call sleeps this long, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, url: &str, body: impl Into<String>) -> &Self {
        self.respond_status(url, 200, body)
    }

    pub fn respond_status(&self, url: &str, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back((status, body.into()));
        self
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn max_gets_in_flight(&self) -> usize {
        self.max_gets_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_posts_in_flight(&self) -> usize {
        self.max_posts_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn pause(&self, in_flight: &AtomicUsize, max_in_flight: &AtomicUsize) {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn get(&self, url: &str) -> Result<Page> {
        self.gets.lock().unwrap().push(url.to_string());
        self.pause(&self.gets_in_flight, &self.max_gets_in_flight)
            .await;

        match self.next_response(url) {
            Some((200, body)) => Ok(Page {
                url: url.to_string(),
                body,
            }),
            Some((status, _)) => Err(Error::HttpStatus {
                url: url.to_string(),
                status,
            }),
            None => Err(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: &str,
        origin: &str,
    ) -> Result<StatusCode> {
        self.posts.lock().unwrap().push(Post {
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            referer: referer.to_string(),
            origin: origin.to_string(),
        });
        self.pause(&self.posts_in_flight, &self.max_posts_in_flight)
            .await;
        Ok(StatusCode::from_u16(self.post_status).unwrap())
    }
}

pub const BASE: &str = "https://movie.douban.com";

pub fn listing_url(username: &str, page: usize) -> String {
    let url = format!("{BASE}/people/{username}/collect?sort=time&mode=grid");
    if page <= 1 {
        url
    } else {
        format!("{url}&start={}", (page - 1) * 15)
    }
}

/// One grid-mode listing item. `intro` decides whether the year is embedded.
pub fn listing_item(id: u64, title: &str, intro: &str, rating: u8, rated_at: &str) -> String {
    let rating = if rating == 0 {
        String::new()
    } else {
        format!(r#"<span class="rating{rating}-t"></span>"#)
    };
    format!(
        r#"
        <div class="item comment-item">
          <div class="info"><ul>
            <li class="title"><a href="https://movie.douban.com/subject/{id}/"><em>{title}</em></a></li>
            <li class="intro">{intro}</li>
            <li>{rating}<span class="date">{rated_at}</span></li>
          </ul></div>
        </div>"#
    )
}

/// A listing page holding `count` items with ids `first_id..first_id + count`.
pub fn listing_page(first_id: u64, count: usize, total_pages: Option<usize>) -> String {
    let items: String = (0..count as u64)
        .map(|n| {
            let id = first_id + n;
            listing_item(id, &format!("电影{id} / Movie {id}"), "2001-01-01(中国大陆)", 3, "2022-03-04")
        })
        .collect();
    page_with_items(&items, total_pages)
}

pub fn page_with_items(items: &str, total_pages: Option<usize>) -> String {
    let paginator = total_pages
        .map(|total| {
            format!(
                r#"<div class="paginator"><span class="thispage" data-total-page="{total}">1</span></div>"#
            )
        })
        .unwrap_or_default();
    format!(r#"<html><body><div class="article"><div class="grid-view">{items}</div>{paginator}</div></body></html>"#)
}

pub fn checkpoint_page(challenge: &str, difficulty: u32) -> String {
    format!(
        r#"<html><head><title>禁止访问</title></head><body>
        <form id="sec" method="POST" action="/c">
          <input type="hidden" id="tok" name="tok" value="tok-{challenge}">
          <input type="hidden" id="cha" name="cha" value="{challenge}">
          <input type="hidden" id="sol" name="sol" value="">
          <input type="hidden" id="red" name="red" value="https://movie.douban.com/">
        </form>
        <script>
          var difficulty = {difficulty};
        </script>
        </body></html>"#
    )
}
