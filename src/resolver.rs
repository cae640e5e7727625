use crate::store::{stage_baseline, stage_baseline_removal, WriteBatch};
use crate::types::{DeltaBaseline, LiveMatch, TrackedMatch};

/// How a tracked match maps onto this cycle's live snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The tracked id is present in the snapshot.
    Matched(&'a LiveMatch),
    /// A placeholder was paired with a live entry; the tracked match must
    /// move to the live id.
    Resolved(&'a LiveMatch),
    /// Not currently resolvable. Retried next cycle.
    Unresolved,
}

/// Resolve `tracked` against the live snapshot.
///
/// Exact id match first. Placeholders then fall back to pairing on team ids
/// and finally on team names, where a name matches when it equals or
/// contains the other, ignoring case. Home is only paired with home.
pub fn resolve<'a>(tracked: &TrackedMatch, live: &'a [LiveMatch]) -> Resolution<'a> {
    if let Some(entry) = live.iter().find(|m| m.id == tracked.fixture_id) {
        return Resolution::Matched(entry);
    }
    if !tracked.is_placeholder() {
        return Resolution::Unresolved;
    }

    let by_ids = live.iter().find(|m| {
        tracked.home_team_id != 0
            && tracked.away_team_id != 0
            && m.home.id == tracked.home_team_id
            && m.away.id == tracked.away_team_id
    });
    let by_names = || {
        live.iter().find(|m| {
            names_match(&tracked.home_team_name, &m.home.name)
                && names_match(&tracked.away_team_name, &m.away.name)
        })
    };

    match by_ids.or_else(by_names) {
        Some(entry) => Resolution::Resolved(entry),
        None => Resolution::Unresolved,
    }
}

/// Case-insensitive equality or containment in either direction.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Stage the move of a baseline from `from` to `to`: the copy and the delete
/// land in the same batch so history is neither lost nor duplicated.
pub fn stage_baseline_migration(
    batch: &mut WriteBatch,
    from: &str,
    to: &str,
    baseline: &DeltaBaseline,
) {
    stage_baseline(batch, to, baseline);
    stage_baseline_removal(batch, from);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_baselines, prev_goals_key, KvStore, MemoryStore};
    use crate::types::{placeholder_id, MatchStatus, TeamRef};

    fn tracked(fixture_id: &str, home: (i64, &str), away: (i64, &str)) -> TrackedMatch {
        TrackedMatch {
            fixture_id: fixture_id.to_string(),
            team_id: home.0,
            team_name: home.1.to_string(),
            is_home: true,
            home_team_id: home.0,
            away_team_id: away.0,
            home_team_name: home.1.to_string(),
            away_team_name: away.1.to_string(),
            home_crest: None,
            away_crest: None,
            home_goals: 0,
            away_goals: 0,
            status: MatchStatus::NotStarted,
            elapsed: None,
            tracked_at: 0,
        }
    }

    fn live(id: &str, home: (i64, &str), away: (i64, &str)) -> LiveMatch {
        LiveMatch {
            id: id.to_string(),
            home: TeamRef { id: home.0, name: home.1.to_string() },
            away: TeamRef { id: away.0, name: away.1.to_string() },
            home_goals: 0,
            away_goals: 0,
            status: MatchStatus::FirstHalf,
            elapsed: Some(5),
        }
    }

    #[test]
    fn exact_id_match() {
        let t = tracked("900", (50, "Man City"), (42, "Arsenal"));
        let snapshot = vec![
            live("800", (1, "A"), (2, "B")),
            live("900", (50, "Man City"), (42, "Arsenal")),
        ];
        assert_eq!(resolve(&t, &snapshot), Resolution::Matched(&snapshot[1]));
    }

    #[test]
    fn real_id_missing_is_unresolved_even_if_names_match() {
        let t = tracked("900", (50, "Man City"), (42, "Arsenal"));
        let snapshot = vec![live("901", (50, "Man City"), (42, "Arsenal"))];
        assert_eq!(resolve(&t, &snapshot), Resolution::Unresolved);
    }

    #[test]
    fn placeholder_resolves_by_team_ids() {
        let t = tracked(&placeholder_id(50, 42), (50, "City"), (42, "Gunners"));
        let snapshot = vec![live("900", (50, "Manchester City"), (42, "Arsenal"))];
        assert_eq!(resolve(&t, &snapshot), Resolution::Resolved(&snapshot[0]));
    }

    #[test]
    fn placeholder_resolves_by_fuzzy_names() {
        let t = tracked(&placeholder_id(0, 0), (0, "manchester city"), (0, "Arsenal"));
        let snapshot = vec![
            live("800", (1, "Manchester United"), (2, "Arsenal")),
            live("900", (7, "Manchester City FC"), (8, "ARSENAL")),
        ];
        assert_eq!(resolve(&t, &snapshot), Resolution::Resolved(&snapshot[1]));
    }

    #[test]
    fn fuzzy_match_respects_home_away_pairing() {
        let t = tracked(&placeholder_id(0, 0), (0, "Arsenal"), (0, "Chelsea"));
        let snapshot = vec![live("900", (8, "Chelsea"), (7, "Arsenal"))];
        assert_eq!(resolve(&t, &snapshot), Resolution::Unresolved);
    }

    #[test]
    fn empty_names_never_match() {
        assert!(!names_match("", "Arsenal"));
        assert!(!names_match("Arsenal", "  "));
        assert!(names_match("Inter", "Inter Milan"));
        assert!(names_match("Bayern München", "bayern münchen"));
    }

    #[tokio::test]
    async fn migration_moves_baseline_without_leaving_stale_key() {
        let store = MemoryStore::new();
        let old = placeholder_id(50, 42);
        let baseline = DeltaBaseline {
            prev_total_goals: Some(1),
            prev_status: Some(MatchStatus::FirstHalf),
        };
        let mut seed = WriteBatch::new();
        stage_baseline(&mut seed, &old, &baseline);
        store.apply(seed).await.unwrap();

        let mut batch = WriteBatch::new();
        stage_baseline_migration(&mut batch, &old, "900", &baseline);
        store.apply(batch).await.unwrap();

        let loaded = load_baselines(store.as_ref(), ["900", old.as_str()]).await.unwrap();
        assert_eq!(loaded["900"], baseline);
        assert_eq!(loaded[old.as_str()], DeltaBaseline::default());
        assert!(!store.contains_key(&prev_goals_key(&old)));
    }
}
