//! Remote metadata: one batched `GetPublishedFileDetails` request per run.
//!
//! Transport failures, non-2xx answers and replies missing `resultcount` or
//! `publishedfiledetails` abort the run. Individual records that fail to
//! decode or carry a failure status are skipped with a warning.

use std::time::Duration;

use serde::{de, Deserialize, Deserializer};

use wsmirror_core::{ItemId, Secret, SyncConfig, WorkshopEntry};

use crate::error::SyncError;

/// Steam's `EResult::OK`.
const RESULT_OK: i64 = 1;

/// Source of per-item metadata.
pub trait MetadataSource {
    fn fetch(&self, ids: &[ItemId]) -> Result<MetadataBatch, SyncError>;
}

// ---------------------------------------------------------------------------
// Response records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    response: MetadataBatch,
}

/// The `response` object of a details request.
///
/// Each element of `publishedfiledetails` is decoded on its own; a record
/// that does not decode is kept as its error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataBatch {
    #[serde(rename = "resultcount")]
    pub result_count: usize,
    #[serde(rename = "publishedfiledetails", deserialize_with = "each_record")]
    pub details: Vec<Result<ItemDetails, String>>,
}

/// One record of `publishedfiledetails`. Steam reports ids and sizes as
/// strings in some versions and numbers in others; both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemDetails {
    #[serde(rename = "publishedfileid", default, deserialize_with = "loose_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "loose_i64")]
    pub result: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_i64")]
    pub time_updated: Option<i64>,
    #[serde(default, deserialize_with = "loose_i64")]
    pub time_created: Option<i64>,
    #[serde(default, deserialize_with = "loose_i64")]
    pub file_size: Option<i64>,
}

impl ItemDetails {
    /// A successful record, as a fake source would return it.
    pub fn success(id: ItemId, title: &str, time_updated: i64, file_size: Option<u64>) -> Self {
        Self {
            id: Some(id.get() as i64),
            result: Some(RESULT_OK),
            title: Some(title.to_string()),
            time_updated: Some(time_updated),
            time_created: None,
            file_size: file_size.map(|s| s as i64),
        }
    }

    /// A record carrying a non-OK status.
    pub fn failure(id: ItemId, result: i64) -> Self {
        Self {
            id: Some(id.get() as i64),
            result: Some(result),
            ..Self::default()
        }
    }

    fn into_entry(self) -> Result<WorkshopEntry, String> {
        let id = self
            .id
            .and_then(|raw| u64::try_from(raw).ok())
            .and_then(ItemId::new)
            .ok_or_else(|| format!("record without a valid id ({:?})", self.id))?;

        match self.result {
            Some(RESULT_OK) => {}
            other => return Err(format!("item {id} returned status {other:?}")),
        }

        let timestamp = self
            .time_updated
            .or(self.time_created)
            .ok_or_else(|| format!("item {id} has neither time_updated nor time_created"))?;
        let file_size = self.file_size.and_then(|s| u64::try_from(s).ok());
        let title = self.title.unwrap_or_default();

        Ok(WorkshopEntry::new(id, title, timestamp, file_size))
    }
}

impl MetadataBatch {
    pub fn new(details: Vec<ItemDetails>) -> Self {
        Self {
            result_count: details.len(),
            details: details.into_iter().map(Ok).collect(),
        }
    }

    /// Build entries from successful records; everything else is skipped.
    pub fn into_entries(self, requested: usize) -> Vec<WorkshopEntry> {
        if self.result_count != requested {
            tracing::warn!(
                requested,
                returned = self.result_count,
                "number of entries in the id list does not match the API response"
            );
        }

        let mut entries = Vec::with_capacity(self.details.len());
        for details in self.details {
            match details.and_then(ItemDetails::into_entry) {
                Ok(entry) => {
                    tracing::info!("workshop entry: {entry}");
                    entries.push(entry);
                }
                Err(reason) => tracing::warn!("skipping metadata record: {reason}"),
            }
        }
        entries
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Text(String),
}

fn each_record<'de, D>(deserializer: D) -> Result<Vec<Result<ItemDetails, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| {
            ItemDetails::deserialize(value).map_err(|e| format!("malformed record: {e}"))
        })
        .collect())
}

fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Int(n)) => Ok(Some(n)),
        Some(Loose::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Steam Web API client
// ---------------------------------------------------------------------------

pub fn user_agent() -> String {
    format!("wsmirror/{}", env!("CARGO_PKG_VERSION"))
}

/// Form body for a details request.
pub fn form_fields(api_key: &Secret, ids: &[ItemId]) -> Vec<(String, String)> {
    let mut fields = Vec::with_capacity(ids.len() + 2);
    fields.push(("key".to_string(), api_key.expose().to_string()));
    fields.push(("itemcount".to_string(), ids.len().to_string()));
    for (i, id) in ids.iter().enumerate() {
        fields.push((format!("publishedfileids[{i}]"), id.to_string()));
    }
    fields
}

pub struct SteamWebApi {
    agent: ureq::Agent,
    url: String,
    api_key: Secret,
}

impl SteamWebApi {
    pub fn new(url: impl Into<String>, api_key: Secret, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(&user_agent())
            .build();
        Self {
            agent,
            url: url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )
    }
}

impl MetadataSource for SteamWebApi {
    fn fetch(&self, ids: &[ItemId]) -> Result<MetadataBatch, SyncError> {
        let fields = form_fields(&self.api_key, ids);
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let response = match self.agent.post(&self.url).send_form(&pairs) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                tracing::error!("got HTTP response {code} from the Steam web API");
                return Err(SyncError::Metadata(format!(
                    "HTTP {code} from {}",
                    self.url
                )));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(SyncError::Metadata(transport.to_string()));
            }
        };
        tracing::info!("got API response from Steam");

        let envelope: Envelope = response
            .into_json()
            .map_err(|e| SyncError::Metadata(format!("malformed API response: {e}")))?;
        Ok(envelope.response)
    }
}
