//! OAI-PMH bulk harvest (`ListRecords`, `arXivRaw` metadata)
//!
//! One request per run, resumed from `provenance/oai_state.json`. The raw
//! response is archived under `_raw/oai/`; records are not parsed here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use papertrend_store::dates::format_date;
use papertrend_store::json::{read_json_opt, write_json};

use crate::harvest::FeedSource;

pub const METADATA_PREFIX: &str = "arXivRaw";

/// Days to look back when no previous harvest is recorded.
const DEFAULT_LOOKBACK_DAYS: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OaiState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_harvest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumption_token: Option<String>,
}

/// What one OAI request produced.
#[derive(Debug, Clone)]
pub struct OaiHarvest {
    pub raw_path: PathBuf,
    pub state: OaiState,
}

pub fn state_path(data_dir: &Path) -> PathBuf {
    data_dir.join("provenance").join("oai_state.json")
}

/// `ListRecords` URL: a pending resumption token wins over `from`.
pub fn build_url(base_url: &str, state: &OaiState, from: &str) -> Result<String> {
    let mut params = vec![("verb", "ListRecords")];
    match state.resumption_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => params.push(("resumptionToken", token)),
        None => {
            params.push(("metadataPrefix", METADATA_PREFIX));
            if !from.is_empty() {
                params.push(("from", from));
            }
        }
    }
    let url = Url::parse_with_params(base_url, &params)
        .with_context(|| format!("invalid OAI url: {base_url}"))?;
    Ok(url.into())
}

/// Text of the first `<resumptionToken>` element, empty when absent.
pub fn extract_resumption_token(xml: &str) -> String {
    let Some(open) = xml.find("<resumptionToken") else {
        return String::new();
    };
    let rest = &xml[open..];
    let Some(gt) = rest.find('>') else {
        return String::new();
    };
    if rest[..gt].ends_with('/') {
        return String::new();
    }
    let body = &rest[gt + 1..];
    body.find("</resumptionToken>")
        .map(|end| body[..end].trim().to_string())
        .unwrap_or_default()
}

/// Issue one `ListRecords` request, archive the response and advance the state.
pub fn harvest_oai<S: FeedSource + ?Sized>(
    source: &S,
    base_url: &str,
    data_dir: &Path,
    now: DateTime<Utc>,
) -> Result<OaiHarvest> {
    let path = state_path(data_dir);
    let state: OaiState = read_json_opt(&path)?.unwrap_or_default();
    let from = state
        .last_harvest
        .clone()
        .unwrap_or_else(|| format_date((now - Duration::days(DEFAULT_LOOKBACK_DAYS)).date_naive()));

    let url = build_url(base_url, &state, &from)?;
    log::info!("OAI ListRecords from {from}");
    let xml = source
        .get(&url)
        .with_context(|| format!("failed to fetch {url}"))?;

    let raw_dir = data_dir.join("_raw").join("oai");
    fs::create_dir_all(&raw_dir)
        .with_context(|| format!("failed to create {}", raw_dir.display()))?;
    let stamp = now.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let raw_path = raw_dir.join(format!("oai-{stamp}.xml"));
    fs::write(&raw_path, &xml)
        .with_context(|| format!("failed to write {}", raw_path.display()))?;

    let token = extract_resumption_token(&xml);
    let next = OaiState {
        last_harvest: Some(format_date(now.date_naive())),
        resumption_token: (!token.is_empty()).then_some(token),
    };
    write_json(&path, &next)?;
    log::debug!("OAI response archived to {}", raw_path.display());

    Ok(OaiHarvest {
        raw_path,
        state: next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use papertrend_core::FetchError;
    use std::cell::RefCell;

    const OAI: &str = "https://export.arxiv.org/oai2";

    struct OneShot {
        body: String,
        url: RefCell<Option<String>>,
    }

    impl FeedSource for OneShot {
        fn get(&self, url: &str) -> Result<String, FetchError> {
            *self.url.borrow_mut() = Some(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 22, 6, 0, 0).unwrap()
    }

    #[test]
    fn url_uses_from_without_token() {
        let url = build_url(OAI, &OaiState::default(), "2026-01-20").unwrap();
        assert_eq!(
            url,
            "https://export.arxiv.org/oai2?verb=ListRecords&metadataPrefix=arXivRaw&from=2026-01-20"
        );
    }

    #[test]
    fn url_prefers_resumption_token() {
        let state = OaiState {
            last_harvest: Some("2026-01-20".into()),
            resumption_token: Some("6541|1001".into()),
        };
        let url = build_url(OAI, &state, "2026-01-20").unwrap();
        assert!(url.contains("resumptionToken=6541%7C1001"));
        assert!(!url.contains("metadataPrefix"));
    }

    #[test]
    fn token_extraction() {
        let xml = r#"<ListRecords><resumptionToken cursor="0" completeListSize="9">abc|1001</resumptionToken></ListRecords>"#;
        assert_eq!(extract_resumption_token(xml), "abc|1001");
        assert_eq!(extract_resumption_token("<resumptionToken/>"), "");
        assert_eq!(extract_resumption_token("<ListRecords/>"), "");
    }

    #[test]
    fn first_harvest_defaults_to_two_days_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = OneShot {
            body: "<OAI-PMH><resumptionToken>next|1</resumptionToken></OAI-PMH>".into(),
            url: RefCell::new(None),
        };
        let harvest = harvest_oai(&source, OAI, dir.path(), now()).unwrap();

        assert!(source.url.borrow().as_deref().unwrap().contains("from=2026-01-20"));
        assert!(harvest.raw_path.exists());
        assert_eq!(harvest.state.last_harvest.as_deref(), Some("2026-01-22"));
        assert_eq!(harvest.state.resumption_token.as_deref(), Some("next|1"));

        let saved: OaiState = papertrend_store::json::read_json(&state_path(dir.path())).unwrap();
        assert_eq!(saved, harvest.state);
    }

    #[test]
    fn completed_list_clears_token() {
        let dir = tempfile::tempdir().unwrap();
        write_json(
            &state_path(dir.path()),
            &OaiState {
                last_harvest: Some("2026-01-19".into()),
                resumption_token: Some("old|5".into()),
            },
        )
        .unwrap();
        let source = OneShot {
            body: "<OAI-PMH><ListRecords/></OAI-PMH>".into(),
            url: RefCell::new(None),
        };
        let harvest = harvest_oai(&source, OAI, dir.path(), now()).unwrap();
        assert!(source.url.borrow().as_deref().unwrap().contains("resumptionToken=old%7C5"));
        assert_eq!(harvest.state.resumption_token, None);

        let json = fs::read_to_string(state_path(dir.path())).unwrap();
        assert!(!json.contains("resumption_token"));
    }
}
