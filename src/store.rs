use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::record::Record;
use crate::render::render_markdown;
use crate::{Error, Result};

/// Creates the output directory (and its parents) if needed and returns it.
pub async fn ensure_outdir(outdir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(outdir).await?;
    Ok(fs::canonicalize(outdir).await?)
}

/// `<outdir>/douban_<username>.json`
pub fn json_path(outdir: &Path, username: &str) -> PathBuf {
    outdir.join(format!("douban_{username}.json"))
}

/// Loads the records written by a previous run.
///
/// A missing file is an empty history. A file holding anything but a JSON list is an error,
/// and so is a rating outside `0..=5`.
pub async fn read_previous(path: &Path) -> Result<Vec<Record>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No previous export at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let value: Value = serde_json::from_slice(&bytes)?;
    if !value.is_array() {
        return Err(Error::InvalidFormat(path.to_path_buf()));
    }
    let records: Vec<Record> = serde_json::from_value(value)?;
    if let Some(bad) = records.iter().find(|r| r.rating > 5) {
        return Err(Error::InvalidStoredRating {
            path: path.to_path_buf(),
            id: bad.id,
            rating: bad.rating,
        });
    }
    Ok(records)
}

/// Replaces `path` with `records` as a pretty-printed JSON list.
pub async fn write_current(path: &Path, records: &[Record]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    write_replacing(path, json.as_bytes()).await
}

/// Replaces `path` with the Markdown rendering of `records`.
pub async fn write_markdown(path: &Path, records: &[Record], username: &str) -> Result<()> {
    let markdown = render_markdown(records, username);
    write_replacing(path, markdown.as_bytes()).await
}

/// Writes to a sibling temp file first so readers never see a half-written file.
async fn write_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
