use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::record::Record;
use crate::{Error, Result};

static RE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/subject/(\d+)/").expect("valid id regex"));
// The intro starts with the release date, so the year has to come first.
static RE_INTRO_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)\d\d\b").expect("valid year regex"));
static RE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d\d\b").expect("valid year regex"));
static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:19|20)\d\d-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])\b")
        .expect("valid date regex")
});

/// One item of a listing page, before the year fallback has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: u64,
    pub detail_url: String,
    pub title: String,
    pub title_zh: Option<String>,
    /// `None` when the intro doesn't start with a year and the detail page has to be asked.
    pub year: Option<u16>,
    pub rating: u8,
    pub rated_at: String,
    pub comment: Option<String>,
}

impl ListingEntry {
    fn into_record(self, year: u16) -> Record {
        Record {
            id: self.id,
            title: self.title,
            title_zh: self.title_zh,
            year,
            rating: self.rating,
            rated_at: self.rated_at,
            comment: self.comment,
        }
    }
}

/// A parsed listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Entries in document order.
    pub entries: Vec<ListingEntry>,
    /// Total number of listing pages according to the paginator, if the page has one.
    pub total_pages: Option<usize>,
}

impl ListingPage {
    /// Turns the entries into `(id, Record)` pairs, in document order.
    ///
    /// Entries without a year in their intro get it from their detail page, fetched through
    /// `fetch_detail`. The first failure aborts the whole page.
    pub async fn into_records<F, Fut>(self, fetch_detail: F) -> Result<Vec<(u64, Record)>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut records = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let year = match entry.year {
                Some(year) => year,
                None => {
                    debug!("No year in intro of {}, asking {}", entry.id, entry.detail_url);
                    let html = fetch_detail(entry.detail_url.clone()).await?;
                    parse_detail_year(&html)?.ok_or_else(|| Error::MissingYear {
                        id: entry.id,
                        title: entry.title.clone(),
                    })?
                }
            };
            records.push((entry.id, entry.into_record(year)));
        }
        Ok(records)
    }
}

/// Parses a listing page off the async executor.
pub(crate) async fn parse_listing(html: String) -> Result<ListingPage> {
    spawn_blocking(move || parse_listing_html(&html)).await?
}

/// Selectors used on a listing page. Built once per page.
struct ListingSelectors {
    item: Selector,
    link: Selector,
    title: Selector,
    intro: Selector,
    rating: Selector,
    date: Selector,
    comment: Selector,
    total_pages: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            item: create_selector("div.grid-view div.comment-item")?,
            link: create_selector(r#"li[class="title"] > a"#)?,
            title: create_selector(r#"li[class="title"] > a > em"#)?,
            intro: create_selector(r#"li[class="intro"]"#)?,
            rating: create_selector(r#"li > span[class^="rating"]"#)?,
            date: create_selector(r#"li > span[class="date"]"#)?,
            comment: create_selector(r#"li > span[class="comment"]"#)?,
            total_pages: create_selector(r#"div[class="paginator"] span[class="thispage"]"#)?,
        })
    }
}

/// Parses the items of a "collect" page in grid mode, plus the paginator's page count.
///
/// Any malformed item fails the whole page: it means the layout changed.
pub fn parse_listing_html(html: &str) -> Result<ListingPage> {
    let doc = Html::parse_document(html);
    let sel = ListingSelectors::new()?;

    // A full page holds 15 items.
    let mut entries = Vec::with_capacity(crate::PAGE_SIZE);
    for item in doc.select(&sel.item) {
        entries.push(parse_item(&item, &sel)?);
    }

    // No paginator at all is a single-page listing, a broken one is a layout change.
    let total_pages = match doc.select(&sel.total_pages).next() {
        Some(span) => {
            let total = span.value().attr("data-total-page").unwrap_or_default();
            match total.trim().parse::<usize>() {
                Ok(total) if total > 0 => Some(total),
                _ => return Err(Error::InvalidPageCount(total.to_string())),
            }
        }
        None => None,
    };

    Ok(ListingPage {
        entries,
        total_pages,
    })
}

fn parse_item(item: &ElementRef, sel: &ListingSelectors) -> Result<ListingEntry> {
    let detail_url = item
        .select(&sel.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();
    let id = RE_ID
        .captures(&detail_url)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| Error::MissingId(detail_url.clone()))?;

    let raw_title = normalize_space(&first_text(item, &sel.title));
    let (title, title_zh) = split_title(&raw_title);
    if title.is_empty() {
        return Err(Error::MissingTitle(id));
    }

    // No year here means a detail page lookup later.
    let intro = first_text(item, &sel.intro);
    let year = RE_INTRO_YEAR
        .find(intro.trim_start())
        .and_then(|m| m.as_str().parse().ok());

    let rating_class = item
        .select(&sel.rating)
        .next()
        .and_then(|span| span.value().attr("class"))
        .unwrap_or_default();
    let rating = rating_from_class(rating_class.trim()).ok_or_else(|| Error::UnknownRating {
        rating: rating_class.to_string(),
        title: title.clone(),
    })?;

    let date = first_text(item, &sel.date);
    let rated_at = RE_DATE
        .find(&date)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidDate {
            date: date.clone(),
            title: title.clone(),
        })?;

    let comment = first_text(item, &sel.comment).trim().to_string();
    let comment = (!comment.is_empty()).then_some(comment);

    Ok(ListingEntry {
        id,
        detail_url,
        title,
        title_zh,
        year,
        rating,
        rated_at,
        comment,
    })
}

/// Reads the release year from the `<h1>` of a subject page.
pub fn parse_detail_year(html: &str) -> Result<Option<u16>> {
    let doc = Html::parse_document(html);
    let year_selector = create_selector(r#"h1 > span[class="year"]"#)?;
    let year = doc
        .select(&year_selector)
        .next()
        .map(|span| span.text().collect::<String>())
        .and_then(|text| RE_YEAR.find(&text).and_then(|m| m.as_str().parse().ok()));
    Ok(year)
}

/// Splits a listing title of the form `"<native> / <original>"` into `(title, title_zh)`.
///
/// Titles without a distinct second half are single-titled and come back with no
/// `title_zh`.
pub fn split_title(raw: &str) -> (String, Option<String>) {
    let (native, original) = raw.split_once(" / ").unwrap_or((raw, ""));
    let (native, original) = (native.trim(), original.trim());
    if original.is_empty() || original == native {
        (native.to_string(), None)
    } else {
        (original.to_string(), Some(native.to_string()))
    }
}

/// Maps the class of a rating marker to its star count. `""` is an unrated movie.
pub fn rating_from_class(class: &str) -> Option<u8> {
    match class {
        "rating1-t" => Some(1),
        "rating2-t" => Some(2),
        "rating3-t" => Some(3),
        "rating4-t" => Some(4),
        "rating5-t" => Some(5),
        "" => Some(0),
        _ => None,
    }
}

/// All the text of the first element matching `selector`, or an empty string.
fn first_text(item: &ElementRef, selector: &Selector) -> String {
    item.select(selector)
        .next()
        .map(|el| el.text().collect())
        .unwrap_or_default()
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[inline]
pub(crate) fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::MissingSelector(sel_str.into()))
}
