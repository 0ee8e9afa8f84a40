//! `compose ps --format json` output parsing

use serde::Deserialize;
use serde_json::Value;
use stackdeck_core::Container;
use tracing::debug;

/// One record of `compose ps --format json`
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Name", default)]
    name: Option<String>,

    #[serde(rename = "State", default)]
    state: Option<String>,

    #[serde(rename = "Health", default)]
    health: Option<String>,

    #[serde(rename = "Image", default)]
    image: Option<String>,

    #[serde(rename = "Publishers", default)]
    publishers: Option<Value>,
}

impl PsEntry {
    /// Published port of the first publisher entry, if any
    fn first_published_port(&self) -> Option<String> {
        let first = self.publishers.as_ref()?.as_array()?.first()?;
        match first.get("PublishedPort")? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn into_container(self) -> Container {
        let port = self.first_published_port().unwrap_or_default();
        Container {
            name: self.name.unwrap_or_default(),
            status: self.state.unwrap_or_default(),
            health: self.health.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            port,
        }
    }
}

/// Parse ps output into containers.
///
/// Output is line-delimited JSON; a line that fails to parse is skipped.
/// Older compose releases print a single JSON array instead, which is also accepted.
pub fn parse_ps_output(output: &str) -> Vec<Container> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[')
        && let Ok(entries) = serde_json::from_str::<Vec<Value>>(trimmed)
    {
        return entries
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<PsEntry>(value) {
                Ok(entry) => Some(entry.into_container()),
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable ps entry");
                    None
                }
            })
            .collect();
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<PsEntry>(line) {
            Ok(entry) => Some(entry.into_container()),
            Err(e) => {
                debug!(error = %e, line, "Skipping unparseable ps line");
                None
            }
        })
        .collect()
}
