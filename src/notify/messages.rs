use std::collections::HashMap;

use crate::types::{NotificationEvent, NotificationKind, TrackedMatch};

/// `(headline, sub_message)` pairs per kind. `{team}` is replaced with the
/// tracked side's name.
fn pool(kind: NotificationKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        NotificationKind::TrackingStarted => &[
            ("Tracking started", "We'll shout when {team} score."),
            ("You're locked in", "Every {team} goal, straight to you."),
            ("Match tracked", "Sit back. We'll keep an eye on {team}."),
        ],
        NotificationKind::Celebration => &[
            ("GOAL!", "{team} find the net!"),
            ("Get in!", "{team} have scored!"),
            ("What a strike!", "{team} are on the board."),
        ],
        NotificationKind::BigLead => &[
            ("Cruising!", "{team} are pulling away."),
            ("Two clear!", "{team} are running riot."),
            ("In control", "{team} have a comfortable cushion."),
        ],
        NotificationKind::Sad => &[
            ("Goal against", "{team} have conceded."),
            ("Ouch", "The opposition scores against {team}."),
            ("Not ideal", "{team} need a response."),
        ],
        NotificationKind::Worried => &[
            ("Pegged back", "It's all square. Come on {team}!"),
            ("Level again", "{team} have let the lead slip."),
            ("Nervy now", "Equaliser against {team}."),
        ],
        NotificationKind::MatchWon => &[
            ("Full time: WIN!", "{team} take all three points."),
            ("Victory!", "Job done for {team}."),
            ("They've done it!", "{team} win it."),
        ],
        NotificationKind::MatchLost => &[
            ("Full time: defeat", "Not {team}'s day."),
            ("It's over", "{team} fall short this time."),
            ("Hard luck", "{team} will go again next week."),
        ],
        NotificationKind::MatchDraw => &[
            ("Full time: draw", "Honours even for {team}."),
            ("All square", "{team} share the points."),
            ("Stalemate", "A point apiece for {team}."),
        ],
    }
}

/// Round-robin position per kind. Owned by the engine, never global.
#[derive(Debug, Default, Clone)]
pub struct MessageRotation {
    next: HashMap<NotificationKind, usize>,
}

impl MessageRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the event for `kind` from the match's current (already updated)
    /// score and status, advancing this kind's rotation.
    pub fn compose(&mut self, kind: NotificationKind, m: &TrackedMatch) -> NotificationEvent {
        let entries = pool(kind);
        let slot = self.next.entry(kind).or_insert(0);
        let (headline, sub_message) = entries[*slot % entries.len()];
        *slot = (*slot + 1) % entries.len();

        NotificationEvent {
            fixture_id: m.fixture_id.clone(),
            kind,
            headline: headline.to_string(),
            sub_message: sub_message.replace("{team}", &m.team_name),
            score_summary: m.score_summary(),
            elapsed_or_status: m.elapsed_or_status(),
        }
    }
}
