//! arXiv Atom feed parser using quick-xml
//!
//! Single-pass event parser over an `export.arxiv.org/api/query` response.
//! Parsing never fails: missing fields degrade to empty values and a
//! malformed document yields the entries completed before the error.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One `<entry>` as it appears in the feed, before normalization.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawEntry {
    /// Identifier without version suffix (`2601.01234`, `hep-th/9901001`)
    pub id: String,
    /// Version suffix from the `<id>` URL (`v2`), empty when absent
    pub version_from_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: String,
    pub updated: String,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub abs_link: String,
    pub pdf_link: String,
    pub versions: Vec<RawVersion>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawVersion {
    pub version: String,
    pub created: String,
}

/// Parsed feed page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedFeed {
    pub entries: Vec<RawEntry>,
    /// `opensearch:totalResults`, 0 when absent or unparseable
    pub total_results: usize,
}

/// Text-bearing elements we collect.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
    TotalResults,
}

impl Field {
    fn tag(self) -> &'static [u8] {
        match self {
            Field::Id => b"id",
            Field::Title => b"title",
            Field::Summary => b"summary",
            Field::Published => b"published",
            Field::Updated => b"updated",
            Field::AuthorName => b"name",
            Field::TotalResults => b"totalResults",
        }
    }
}

/// Parse an Atom document into entries and the reported total.
pub fn parse_feed(xml: &str) -> ParsedFeed {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut entry: Option<RawEntry> = None;
    let mut in_author = false;
    let mut capture: Option<Field> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match (entry.is_some(), name.as_ref()) {
                    (false, b"entry") => {
                        entry = Some(RawEntry::default());
                        in_author = false;
                    }
                    (false, b"totalResults") => capture = Some(Field::TotalResults),
                    (true, b"author") => in_author = true,
                    (true, b"id") => capture = Some(Field::Id),
                    (true, b"title") => capture = Some(Field::Title),
                    (true, b"summary") => capture = Some(Field::Summary),
                    (true, b"published") => capture = Some(Field::Published),
                    (true, b"updated") => capture = Some(Field::Updated),
                    (true, b"name") if in_author => capture = Some(Field::AuthorName),
                    (true, tag) => {
                        if let Some(current) = entry.as_mut() {
                            apply_attributes(current, tag, &e);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    apply_attributes(current, e.local_name().as_ref(), &e);
                }
            }
            Ok(Event::Text(t)) if capture.is_some() => match t.unescape() {
                Ok(s) => push_text(&mut text, &s),
                Err(err) => {
                    log::debug!("feed parse stopped: {err}");
                    break;
                }
            },
            Ok(Event::CData(t)) if capture.is_some() => {
                push_text(&mut text, &String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let tag = name.as_ref();
                if let Some(field) = capture.filter(|f| f.tag() == tag) {
                    let value = collapse_whitespace(&text);
                    text.clear();
                    capture = None;
                    match (field, entry.as_mut()) {
                        (Field::TotalResults, _) => {
                            feed.total_results = value.parse().unwrap_or(0);
                        }
                        (field, Some(current)) => store_field(current, field, value),
                        (_, None) => {}
                    }
                } else if tag == b"author" {
                    in_author = false;
                } else if tag == b"entry" {
                    if let Some(done) = entry.take() {
                        feed.entries.push(finish_entry(done));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                log::debug!(
                    "feed parse stopped at byte {}: {err}",
                    reader.buffer_position()
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    feed
}

fn store_field(entry: &mut RawEntry, field: Field, value: String) {
    match field {
        Field::Id => {
            let (id, version) = split_version(extract_id(&value));
            entry.id = id.to_string();
            entry.version_from_id = version.to_string();
        }
        Field::Title => entry.title = value,
        Field::Summary => entry.summary = value,
        Field::Published => entry.published = value,
        Field::Updated => entry.updated = value,
        Field::AuthorName => {
            if !value.is_empty() {
                entry.authors.push(value);
            }
        }
        Field::TotalResults => {}
    }
}

/// Attribute-only elements: categories, links and explicit versions.
fn apply_attributes(entry: &mut RawEntry, tag: &[u8], e: &BytesStart<'_>) {
    match tag {
        b"category" => {
            if let Some(term) = attr(e, b"term").filter(|t| !t.is_empty()) {
                entry.categories.push(term);
            }
        }
        b"primary_category" => {
            if let Some(term) = attr(e, b"term") {
                entry.primary_category = term;
            }
        }
        b"link" => {
            let Some(href) = attr(e, b"href") else {
                return;
            };
            if entry.abs_link.is_empty() && attr(e, b"rel").as_deref() == Some("alternate") {
                entry.abs_link = href;
            } else if entry.pdf_link.is_empty()
                && attr(e, b"type").as_deref() == Some("application/pdf")
            {
                entry.pdf_link = href;
            }
        }
        b"version" => {
            if let (Some(version), Some(created)) = (attr(e, b"version"), attr(e, b"created")) {
                entry.versions.push(RawVersion { version, created });
            }
        }
        _ => {}
    }
}

/// Fill fallbacks once the entry is closed.
fn finish_entry(mut entry: RawEntry) -> RawEntry {
    if entry.primary_category.is_empty() {
        if let Some(first) = entry.categories.first() {
            entry.primary_category = first.clone();
        }
    }
    if entry.abs_link.is_empty() {
        entry.abs_link = format!("https://arxiv.org/abs/{}", entry.id);
    }
    if entry.pdf_link.is_empty() {
        entry.pdf_link = format!("https://arxiv.org/pdf/{}.pdf", entry.id);
    }
    if entry.versions.is_empty() && !entry.version_from_id.is_empty() {
        let created = if entry.updated.is_empty() {
            entry.published.clone()
        } else {
            entry.updated.clone()
        };
        entry.versions.push(RawVersion {
            version: entry.version_from_id.clone(),
            created,
        });
    }
    entry
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(a.value.as_ref()).into_owned(),
        })
}

fn push_text(buf: &mut String, s: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(s);
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `http://arxiv.org/abs/2601.01234v2` → `2601.01234v2`; other values pass through.
pub fn extract_id(value: &str) -> &str {
    const MARKER: &str = "arxiv.org/abs/";
    let lower = value.to_ascii_lowercase();
    match lower.find(MARKER) {
        Some(pos) => {
            let rest = &value[pos + MARKER.len()..];
            rest.split(['?', '#']).next().unwrap_or(rest)
        }
        None => value,
    }
}

/// Split a trailing `vN` suffix: `2601.01234v2` → (`2601.01234`, `v2`).
pub fn split_version(id: &str) -> (&str, &str) {
    if let Some(pos) = id.rfind(['v', 'V']) {
        let digits = &id[pos + 1..];
        if pos > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return (&id[..pos], &id[pos..]);
        }
    }
    (id, "")
}
