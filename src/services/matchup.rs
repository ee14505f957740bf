use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Matchup, StatBundle, Table, TeamRankRow};
use crate::services::validator::run_validations;
use crate::utils::format_average;

/// ` @ `, ` vs. ` or ` vs ` with any amount of surrounding whitespace.
static MATCHUP_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*@\s*|\s+vs\.\s+|\s+vs\s+").expect("valid separator pattern"));

const SHEET_COLUMNS: [&str; 2] = ["Team", "Rank"];

/// Split a `Teams` cell into its two team names. Returns `None` unless the text
/// splits into exactly two non-empty parts.
pub fn split_matchup(text: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = MATCHUP_SEPARATOR.split(text.trim()).map(str::trim).collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Some((a.to_string(), b.to_string())),
        _ => None,
    }
}

/// Rank of `team_name` in every sheet of the bundle, in bundle order.
/// Sheets that fail validation for `Team` and `Rank` always yield `None`.
pub fn get_team_rank(team_name: &str, bundle: &StatBundle) -> Vec<Option<u32>> {
    bundle
        .iter()
        .map(|sheet| {
            if !run_validations(&sheet.table, &sheet.name, Some(&SHEET_COLUMNS)) {
                return None;
            }
            lookup_rank(team_name, &sheet.name, &sheet.table)
        })
        .collect()
}

/// Case-insensitive substring lookup; the first matching row wins.
fn lookup_rank(team_name: &str, sheet_name: &str, table: &Table) -> Option<u32> {
    let team_idx = table.column_index("Team")?;
    let rank_idx = table.column_index("Rank")?;
    let needle = team_name.to_lowercase();

    let row = table.rows.iter().find(|row| {
        row.get(team_idx)
            .and_then(|cell| cell.as_deref())
            .is_some_and(|team| team.to_lowercase().contains(&needle))
    })?;

    let raw = row.get(rank_idx)?.as_deref()?.trim();
    match raw.parse::<u32>() {
        Ok(rank) if rank > 0 => Some(rank),
        _ => {
            tracing::warn!("{}: unusable rank '{}' for {}", sheet_name, raw, team_name);
            None
        }
    }
}

/// Sum and average of the present ranks. The average is `None` when no sheet
/// had the team.
pub fn summarize_ranks(ranks: &[Option<u32>]) -> (u64, Option<f64>) {
    let present: Vec<u64> = ranks.iter().flatten().map(|&r| u64::from(r)).collect();
    let sum: u64 = present.iter().sum();
    let avg = if present.is_empty() {
        None
    } else {
        Some(sum as f64 / present.len() as f64)
    };
    (sum, avg)
}

/// Matchup for one schedule row, or `None` (logged) if its `Teams` cell is malformed.
pub fn matchup_from_row(schedule: &Table, row: usize) -> Option<Matchup> {
    let teams = schedule.cell(row, "Teams").unwrap_or_default();
    let Some((team_a, team_b)) = split_matchup(teams) else {
        tracing::warn!("Skipping malformed matchup in row {}: {}", row, teams);
        return None;
    };

    Some(Matchup {
        team_a,
        team_b,
        kickoff: schedule.cell(row, "Time").map(str::to_string),
        location: schedule.cell(row, "Location").map(str::to_string),
    })
}

/// Join the schedule with the stat bundle: two rows per well-formed matchup,
/// tagged `Match <n>` where `n` is the 1-based schedule row.
pub fn build_matchup_stats(schedule: &Table, bundle: &StatBundle) -> Vec<TeamRankRow> {
    if !run_validations(schedule, "Weekly Schedule", Some(&["Teams"])) {
        tracing::error!("Validation failed for schedule; no matchups built.");
        return Vec::new();
    }

    let mut rows = Vec::with_capacity(schedule.rows.len() * 2);

    for idx in 0..schedule.rows.len() {
        let Some(matchup) = matchup_from_row(schedule, idx) else {
            continue;
        };
        tracing::debug!(
            "Row {}: {} vs {} at {} ({})",
            idx,
            matchup.team_a,
            matchup.team_b,
            matchup.location.as_deref().unwrap_or("unknown venue"),
            matchup.kickoff.as_deref().unwrap_or("TBD")
        );

        let match_id = format!("Match {}", idx + 1);
        for team in [matchup.team_a, matchup.team_b] {
            let ranks = get_team_rank(&team, bundle);
            let (rank_sum, rank_avg) = summarize_ranks(&ranks);
            rows.push(TeamRankRow {
                match_id: match_id.clone(),
                team,
                ranks,
                rank_sum,
                rank_avg,
            });
        }
    }

    tracing::info!("Built {} team rows from {} schedule rows", rows.len(), schedule.rows.len());
    rows
}

/// Output table: `Match ID`, `Team`, `Rank_<sheet>`..., `Rank Total`, `Rank Average`.
pub fn matchup_table(rows: &[TeamRankRow], sheet_names: &[String]) -> Table {
    let mut columns = vec!["Match ID".to_string(), "Team".to_string()];
    columns.extend(sheet_names.iter().map(|name| format!("Rank_{}", name)));
    columns.push("Rank Total".to_string());
    columns.push("Rank Average".to_string());

    let mut table = Table::new(columns);
    for row in rows {
        let mut cells = vec![Some(row.match_id.clone()), Some(row.team.clone())];
        cells.extend(row.ranks.iter().map(|rank| rank.map(|r| r.to_string())));
        cells.push(Some(row.rank_sum.to_string()));
        cells.push(row.rank_avg.map(|avg| format_average(Some(avg))));
        table.push_row(cells);
    }
    table
}
