use tracing::{debug, warn};

use crate::detector::classifier::{classify_goal, classify_result};
use crate::types::{DeltaBaseline, LiveMatch, NotificationKind, TrackedMatch};

/// Outcome of comparing one poll against the previous one for a fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// At most one event per fixture per cycle.
    pub kind: Option<NotificationKind>,
    /// The match is in a finished status and must be untracked.
    pub finished: bool,
    /// Baseline to persist for the next cycle.
    pub baseline: DeltaBaseline,
}

/// Compare `live` against `baseline`, classify what changed, and fold the
/// live score/status into `tracked`.
///
/// Several goals between two polls yield a single event classified from the
/// final score. A match-end transition suppresses any goal scored in the
/// same cycle. Each side's count is held at its stored value when the live
/// count drops below it (a stale snapshot or a disallowed goal), so the
/// other side's goals are still seen. The final result is taken from the
/// live score as reported at the whistle.
pub fn detect(
    tracked: &mut TrackedMatch,
    baseline: &DeltaBaseline,
    live: &LiveMatch,
) -> Detection {
    let home_goals = tracked.home_goals.max(live.home_goals);
    let away_goals = tracked.away_goals.max(live.away_goals);
    if (home_goals, away_goals) != (live.home_goals, live.away_goals) {
        warn!(
            fixture_id = %tracked.fixture_id,
            stored = %format!("{}-{}", tracked.home_goals, tracked.away_goals),
            live = %format!("{}-{}", live.home_goals, live.away_goals),
            "Live score went backwards, holding stored count"
        );
    }
    let total = home_goals + away_goals;

    let (user_goals, opp_goals) = tracked.sides(home_goals, away_goals);
    let (prev_user_goals, prev_opp_goals) = tracked.sides(tracked.home_goals, tracked.away_goals);

    let goal_scored = baseline.prev_total_goals.is_some_and(|prev| total > prev);
    let was_live = baseline.prev_status.as_ref().is_some_and(|s| s.is_live());
    let now_finished = live.status.is_finished();

    let kind = if was_live && now_finished {
        let (final_user, final_opp) = tracked.sides(live.home_goals, live.away_goals);
        Some(classify_result(final_user, final_opp))
    } else if goal_scored {
        Some(classify_goal(user_goals, opp_goals, prev_user_goals, prev_opp_goals))
    } else {
        None
    };

    if let Some(kind) = kind {
        debug!(
            fixture_id = %tracked.fixture_id,
            kind = %kind,
            user_goals,
            opp_goals,
            "Delta classified"
        );
    }

    // A finished match leaves the tracked set this cycle, so its last
    // snapshot carries the official score.
    if now_finished {
        tracked.home_goals = live.home_goals;
        tracked.away_goals = live.away_goals;
    } else {
        tracked.home_goals = home_goals;
        tracked.away_goals = away_goals;
    }
    tracked.status = live.status.clone();
    tracked.elapsed = live.elapsed;

    Detection {
        kind,
        finished: now_finished,
        baseline: DeltaBaseline {
            prev_total_goals: Some(total),
            prev_status: Some(live.status.clone()),
        },
    }
}
