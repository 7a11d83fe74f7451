//! Weekly leaderboard rendering.
//!
//! The settlement itself (append the reset event, fold it) lives with the
//! lock discipline in [`crate::hall`]; this module is the pure projection
//! from state to ranking text.

use crate::state::CommunityState;

/// At most this many members appear in the rendered ranking.
pub const RANKING_LIMIT: usize = 20;
/// Bar length of the top member; everyone else is proportional.
pub const BAR_WIDTH: usize = 20;

pub const RANKING_HEADER: &str = "📊 Weekly study ranking";
pub const EMPTY_RANKING: &str = "No study records this week.";

/// Render the weekly leaderboard. Members with zero weekly time are
/// excluded; ties keep their first-seen order.
pub fn render_ranking(state: &CommunityState) -> String {
    let mut rows: Vec<_> = state
        .members
        .values()
        .filter(|m| m.weekly_secs > 0)
        .collect();
    rows.sort_by(|a, b| b.weekly_secs.cmp(&a.weekly_secs));

    if rows.is_empty() {
        return EMPTY_RANKING.to_string();
    }

    let top = rows[0].weekly_secs.max(1);
    let mut lines = vec![RANKING_HEADER.to_string()];
    for (idx, m) in rows.iter().take(RANKING_LIMIT).enumerate() {
        let len = ((m.weekly_secs as f64 / top as f64) * BAR_WIDTH as f64).round() as usize;
        let bar = "■".repeat(len.max(1));
        let hours = m.weekly_secs as f64 / 3600.0;
        lines.push(format!("{}. {} {bar} ({hours:.1}h)", idx + 1, m.display_name));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::week_start;
    use chrono::NaiveDate;

    fn state_with(totals: &[(&str, i64)]) -> CommunityState {
        let monday = week_start(NaiveDate::from_ymd_opt(2026, 8, 5).unwrap());
        let mut state = CommunityState::new(monday);
        for (name, secs) in totals {
            state.member_mut(name, name).weekly_secs = *secs;
        }
        state
    }

    #[test]
    fn ranks_exclude_zero_and_scale_bars() {
        let state = state_with(&[("ann", 7200), ("bo", 3600), ("cy", 0)]);
        let text = render_ranking(&state);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], RANKING_HEADER);
        assert_eq!(lines.len(), 3); // header + two ranked members
        assert_eq!(lines[1], format!("1. ann {} (2.0h)", "■".repeat(20)));
        assert_eq!(lines[2], format!("2. bo {} (1.0h)", "■".repeat(10)));
        assert!(!text.contains("cy"));
    }

    #[test]
    fn every_ranked_member_gets_a_visible_bar() {
        let state = state_with(&[("ann", 100_000), ("bo", 10)]);
        let text = render_ranking(&state);
        assert!(text.contains("2. bo ■ "));
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let state = state_with(&[("bo", 3600), ("ann", 3600)]);
        let text = render_ranking(&state);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("1. bo"));
        assert!(lines[2].starts_with("2. ann"));
    }

    #[test]
    fn empty_week_reports_no_records() {
        let state = state_with(&[("ann", 0)]);
        assert_eq!(render_ranking(&state), EMPTY_RANKING);
    }

    #[test]
    fn ranking_is_capped() {
        let totals: Vec<(String, i64)> = (0..30).map(|i| (format!("m{i}"), 1000 + i)).collect();
        let monday = week_start(NaiveDate::from_ymd_opt(2026, 8, 5).unwrap());
        let mut state = CommunityState::new(monday);
        for (name, secs) in &totals {
            state.member_mut(name, name).weekly_secs = *secs;
        }
        let text = render_ranking(&state);
        assert_eq!(text.lines().count(), 1 + RANKING_LIMIT);
    }
}
