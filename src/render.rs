use tracing::warn;

use crate::record::Record;

/// Renders the records as Markdown, grouped by rating from 5 stars down to unrated.
///
/// Records keep their relative order inside a group.
pub fn render_markdown(records: &[Record], username: &str) -> String {
    let mut buckets: [Vec<&Record>; 6] = Default::default();
    for record in records {
        match buckets.get_mut(usize::from(record.rating)) {
            Some(bucket) => bucket.push(record),
            None => warn!("Skipping {} with out of range rating {}", record.id, record.rating),
        }
    }

    let mut out = format!("# Douban movie ratings of {username}\n");
    for rating in (0..=5).rev() {
        let bucket = &buckets[rating];
        if bucket.is_empty() {
            continue;
        }
        if rating > 0 {
            out.push_str(&format!("\n## {} ({rating} stars)\n\n", "★".repeat(rating)));
        } else {
            out.push_str("\n## Unrated\n\n");
        }
        for record in bucket {
            let line = match &record.title_zh {
                Some(title_zh) => format!("* {} / {title_zh} ({})\n", record.title, record.year),
                None => format!("* {} ({})\n", record.title, record.year),
            };
            out.push_str(&line);
        }
    }
    out
}
