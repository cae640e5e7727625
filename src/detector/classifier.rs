use crate::types::NotificationKind;

/// Lead the tracked side needs after scoring to count as a big lead.
pub const BIG_LEAD_MARGIN: u32 = 2;

/// Classify a goal from the tracked side's point of view.
///
/// `prev_*` come from the last stored score, not the baseline total, so the
/// side that moved is known. When neither side moved (a correction that
/// still raised the total) the result defaults to `Celebration`.
pub fn classify_goal(
    user_goals: u32,
    opp_goals: u32,
    prev_user_goals: u32,
    prev_opp_goals: u32,
) -> NotificationKind {
    if user_goals > prev_user_goals {
        if user_goals.saturating_sub(opp_goals) >= BIG_LEAD_MARGIN {
            NotificationKind::BigLead
        } else {
            NotificationKind::Celebration
        }
    } else if opp_goals > prev_opp_goals {
        if user_goals == opp_goals {
            NotificationKind::Worried
        } else {
            NotificationKind::Sad
        }
    } else {
        NotificationKind::Celebration
    }
}

/// Final result from the tracked side's point of view.
pub fn classify_result(user_goals: u32, opp_goals: u32) -> NotificationKind {
    use std::cmp::Ordering;
    match user_goals.cmp(&opp_goals) {
        Ordering::Greater => NotificationKind::MatchWon,
        Ordering::Less => NotificationKind::MatchLost,
        Ordering::Equal => NotificationKind::MatchDraw,
    }
}
