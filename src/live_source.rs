use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, FETCH_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::{LiveMatch, MatchStatus, TeamRef};

/// Fetchable list of every in-progress match.
#[async_trait]
pub trait LiveMatchSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<LiveMatch>>;
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

pub struct HttpLiveSource {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpLiveSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: cfg.live_source_url.clone(),
            api_key: cfg.live_source_api_key.clone(),
        })
    }
}

#[async_trait]
impl LiveMatchSource for HttpLiveSource {
    async fn fetch(&self) -> Result<Vec<LiveMatch>> {
        let mut req = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            req = req.header("x-apisports-key", key);
        }
        let resp: Value = req.send().await?.error_for_status()?.json().await?;

        let (matches, skipped) = parse_live_matches(&resp)?;
        if skipped > 0 {
            debug!(skipped, "Skipped {skipped} unparseable live entries");
        }
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a live source body into matches. Accepts a bare list of
/// `{id, home, away, goals, status, elapsed}` entries or the provider
/// envelope `{"response": [{fixture, teams, goals}]}`.
///
/// Returns the parsed matches and the count of entries that were skipped as
/// malformed. A body that is not a list at all is an error.
pub fn parse_live_matches(body: &Value) -> Result<(Vec<LiveMatch>, usize)> {
    let items = body
        .as_array()
        .or_else(|| body.get("response").and_then(Value::as_array))
        .ok_or_else(|| AppError::LiveSource("live source response was not a list".to_string()))?;

    let mut matches = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        let parsed = if item.get("fixture").is_some() {
            parse_provider_entry(item)
        } else {
            parse_flat_entry(item)
        };
        match parsed {
            Some(m) => matches.push(m),
            None => skipped += 1,
        }
    }
    Ok((matches, skipped))
}

fn parse_flat_entry(item: &Value) -> Option<LiveMatch> {
    let status = match item.get("status")? {
        Value::String(s) => MatchStatus::from_code(s),
        obj => MatchStatus::from_code(obj.get("short")?.as_str()?),
    };
    let elapsed = item
        .get("elapsed")
        .or_else(|| item.get("status").and_then(|s| s.get("elapsed")))
        .and_then(as_u32);
    let goals = item.get("goals");

    Some(LiveMatch {
        id: id_string(item.get("id")?)?,
        home: parse_team(item.get("home")?)?,
        away: parse_team(item.get("away")?)?,
        home_goals: goals.and_then(|g| g.get("home")).and_then(as_u32).unwrap_or(0),
        away_goals: goals.and_then(|g| g.get("away")).and_then(as_u32).unwrap_or(0),
        status,
        elapsed,
    })
}

fn parse_provider_entry(item: &Value) -> Option<LiveMatch> {
    let fixture = item.get("fixture")?;
    let status = fixture.get("status")?;
    let teams = item.get("teams")?;
    let goals = item.get("goals");

    Some(LiveMatch {
        id: id_string(fixture.get("id")?)?,
        home: parse_team(teams.get("home")?)?,
        away: parse_team(teams.get("away")?)?,
        home_goals: goals.and_then(|g| g.get("home")).and_then(as_u32).unwrap_or(0),
        away_goals: goals.and_then(|g| g.get("away")).and_then(as_u32).unwrap_or(0),
        status: MatchStatus::from_code(status.get("short")?.as_str()?),
        elapsed: status.get("elapsed").and_then(as_u32),
    })
}

fn parse_team(v: &Value) -> Option<TeamRef> {
    let name = v.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(TeamRef {
        id: v.get("id").and_then(Value::as_i64).unwrap_or(0),
        name: name.to_string(),
    })
}

/// Ids arrive as numbers from the provider and as strings elsewhere.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u32(v: &Value) -> Option<u32> {
    v.as_u64().and_then(|n| u32::try_from(n).ok())
}
