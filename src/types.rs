use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PLACEHOLDER_PREFIX;

// ---------------------------------------------------------------------------
// Match status vocabulary
// ---------------------------------------------------------------------------

/// Short status codes as reported by the live source. Unknown codes are kept
/// verbatim so they survive a persist/reload round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchStatus {
    NotStarted,
    ToBeDefined,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    /// Break before extra time or between extra-time halves.
    BreakTime,
    /// Penalty shootout in progress.
    Penalties,
    /// In play, period not reported.
    Live,
    Interrupted,
    FullTime,
    AfterExtraTime,
    /// Finished after a penalty shootout.
    AfterPenalties,
    Suspended,
    Postponed,
    Cancelled,
    Abandoned,
    Awarded,
    Walkover,
    Other(String),
}

impl MatchStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "NS" => MatchStatus::NotStarted,
            "TBD" => MatchStatus::ToBeDefined,
            "1H" => MatchStatus::FirstHalf,
            "HT" => MatchStatus::HalfTime,
            "2H" => MatchStatus::SecondHalf,
            "ET" => MatchStatus::ExtraTime,
            "BT" => MatchStatus::BreakTime,
            "P" => MatchStatus::Penalties,
            "LIVE" => MatchStatus::Live,
            "INT" => MatchStatus::Interrupted,
            "FT" => MatchStatus::FullTime,
            "AET" => MatchStatus::AfterExtraTime,
            "PEN" => MatchStatus::AfterPenalties,
            "SUSP" => MatchStatus::Suspended,
            "PST" => MatchStatus::Postponed,
            "CANC" => MatchStatus::Cancelled,
            "ABD" => MatchStatus::Abandoned,
            "AWD" => MatchStatus::Awarded,
            "WO" => MatchStatus::Walkover,
            _ => MatchStatus::Other(code.trim().to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            MatchStatus::NotStarted => "NS",
            MatchStatus::ToBeDefined => "TBD",
            MatchStatus::FirstHalf => "1H",
            MatchStatus::HalfTime => "HT",
            MatchStatus::SecondHalf => "2H",
            MatchStatus::ExtraTime => "ET",
            MatchStatus::BreakTime => "BT",
            MatchStatus::Penalties => "P",
            MatchStatus::Live => "LIVE",
            MatchStatus::Interrupted => "INT",
            MatchStatus::FullTime => "FT",
            MatchStatus::AfterExtraTime => "AET",
            MatchStatus::AfterPenalties => "PEN",
            MatchStatus::Suspended => "SUSP",
            MatchStatus::Postponed => "PST",
            MatchStatus::Cancelled => "CANC",
            MatchStatus::Abandoned => "ABD",
            MatchStatus::Awarded => "AWD",
            MatchStatus::Walkover => "WO",
            MatchStatus::Other(code) => code,
        }
    }

    /// Live-play set: a transition from one of these into the finished set
    /// is a match end.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            MatchStatus::FirstHalf
                | MatchStatus::HalfTime
                | MatchStatus::SecondHalf
                | MatchStatus::ExtraTime
                | MatchStatus::BreakTime
                | MatchStatus::Penalties
                | MatchStatus::Live
                | MatchStatus::Interrupted
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            MatchStatus::FullTime | MatchStatus::AfterExtraTime | MatchStatus::AfterPenalties
        )
    }

    /// Display string: minutes while the ball is in play, a label otherwise.
    pub fn display(&self, elapsed: Option<u32>) -> String {
        match self {
            MatchStatus::FirstHalf
            | MatchStatus::SecondHalf
            | MatchStatus::ExtraTime
            | MatchStatus::Live => match elapsed {
                Some(min) => format!("{min}'"),
                None => "Live".to_string(),
            },
            MatchStatus::NotStarted | MatchStatus::ToBeDefined => "Not Started".to_string(),
            MatchStatus::HalfTime => "Half Time".to_string(),
            MatchStatus::BreakTime => "Break".to_string(),
            MatchStatus::Penalties => "Penalty Shootout".to_string(),
            MatchStatus::Interrupted => "Interrupted".to_string(),
            MatchStatus::FullTime => "Full Time".to_string(),
            MatchStatus::AfterExtraTime => "After Extra Time".to_string(),
            MatchStatus::AfterPenalties => "After Penalties".to_string(),
            MatchStatus::Suspended => "Suspended".to_string(),
            MatchStatus::Postponed => "Postponed".to_string(),
            MatchStatus::Cancelled => "Cancelled".to_string(),
            MatchStatus::Abandoned => "Abandoned".to_string(),
            MatchStatus::Awarded => "Awarded".to_string(),
            MatchStatus::Walkover => "Walkover".to_string(),
            MatchStatus::Other(code) => code.clone(),
        }
    }
}

impl From<String> for MatchStatus {
    fn from(code: String) -> Self {
        MatchStatus::from_code(&code)
    }
}

impl From<MatchStatus> for String {
    fn from(status: MatchStatus) -> Self {
        status.code().to_string()
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Live match source snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

/// One in-progress match as reported by the live source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMatch {
    pub id: String,
    pub home: TeamRef,
    pub away: TeamRef,
    pub home_goals: u32,
    pub away_goals: u32,
    pub status: MatchStatus,
    pub elapsed: Option<u32>,
}

// ---------------------------------------------------------------------------
// Tracked match (durable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedMatch {
    /// Source fixture id, or `pending_{home}_{away}` until resolved.
    pub fixture_id: String,
    pub team_id: i64,
    pub team_name: String,
    pub is_home: bool,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team_name: String,
    pub away_team_name: String,
    #[serde(default)]
    pub home_crest: Option<String>,
    #[serde(default)]
    pub away_crest: Option<String>,
    pub home_goals: u32,
    pub away_goals: u32,
    pub status: MatchStatus,
    #[serde(default)]
    pub elapsed: Option<u32>,
    /// Unix milliseconds.
    pub tracked_at: u64,
}

impl TrackedMatch {
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_id(&self.fixture_id)
    }

    #[cfg(test)]
    pub fn total_goals(&self) -> u32 {
        self.home_goals + self.away_goals
    }

    /// `(user, opponent)` split of a home/away score from the tracked side.
    pub fn sides(&self, home_goals: u32, away_goals: u32) -> (u32, u32) {
        if self.is_home {
            (home_goals, away_goals)
        } else {
            (away_goals, home_goals)
        }
    }

    /// "Home N - M Away"
    pub fn score_summary(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.home_team_name, self.home_goals, self.away_goals, self.away_team_name
        )
    }

    pub fn elapsed_or_status(&self) -> String {
        self.status.display(self.elapsed)
    }
}

/// fixture_id → tracked match. Ordered so snapshots serialize deterministically.
pub type TrackedMap = BTreeMap<String, TrackedMatch>;

pub fn placeholder_id(home_team_id: i64, away_team_id: i64) -> String {
    format!("{PLACEHOLDER_PREFIX}{home_team_id}_{away_team_id}")
}

pub fn is_placeholder_id(fixture_id: &str) -> bool {
    fixture_id.starts_with(PLACEHOLDER_PREFIX)
}

// ---------------------------------------------------------------------------
// Delta baseline (volatile)
// ---------------------------------------------------------------------------

/// Last processed goal total and status for one fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaBaseline {
    pub prev_total_goals: Option<u32>,
    pub prev_status: Option<MatchStatus>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TrackingStarted,
    /// Tracked side scored.
    Celebration,
    /// Tracked side scored and leads by two or more.
    BigLead,
    /// Opponent scored and leads or extends a lead.
    Sad,
    /// Opponent scored to level the match.
    Worried,
    MatchWon,
    MatchLost,
    MatchDraw,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 8] = [
        NotificationKind::TrackingStarted,
        NotificationKind::Celebration,
        NotificationKind::BigLead,
        NotificationKind::Sad,
        NotificationKind::Worried,
        NotificationKind::MatchWon,
        NotificationKind::MatchLost,
        NotificationKind::MatchDraw,
    ];
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::TrackingStarted => "tracking_started",
            NotificationKind::Celebration => "celebration",
            NotificationKind::BigLead => "big_lead",
            NotificationKind::Sad => "sad",
            NotificationKind::Worried => "worried",
            NotificationKind::MatchWon => "match_won",
            NotificationKind::MatchLost => "match_lost",
            NotificationKind::MatchDraw => "match_draw",
        };
        write!(f, "{s}")
    }
}

/// A composed notification, consumed exactly once by the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub fixture_id: String,
    pub kind: NotificationKind,
    pub headline: String,
    pub sub_message: String,
    pub score_summary: String,
    pub elapsed_or_status: String,
}
