//! Plain-text rendering of server replies for the terminal.

use shared::{GameInfo, LeaderboardEntry, Reply, TargetView};
use std::fmt::Write;

/// Standings sorted by kills (highest first), then name.
pub fn render_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut sorted: Vec<&LeaderboardEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.kills.cmp(&a.kills).then_with(|| a.name.cmp(&b.name)));

    let width = name_width(sorted.iter().map(|e| e.name.as_str()), "PLAYER");
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>5}  STATUS", "PLAYER", "KILLS");
    for entry in sorted {
        let status = match (&entry.killed_by, entry.alive) {
            (_, true) => "alive".to_string(),
            (Some(killer), false) => format!("killed by {}", killer),
            (None, false) => "killed".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:>5}  {}",
            entry.name, entry.kills, status
        );
    }
    out
}

pub fn render_targets(views: &[TargetView]) -> String {
    let width = name_width(views.iter().map(|v| v.from_name.as_str()), "HUNTER");
    let mut out = String::new();
    let _ = writeln!(out, "{:>8}  {:<width$}  {:<12}  PREY", "RECORD", "HUNTER", "STATUS");
    for view in views {
        let _ = writeln!(
            out,
            "{:>8}  {:<width$}  {:<12}  {}",
            view.record_id.0,
            view.from_name,
            view.status.to_string(),
            view.to_name
        );
    }
    out
}

pub fn render_game_info(info: &GameInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}): {}", info.name, info.game_id, info.status);
    match info.role {
        Some(role) => {
            let _ = writeln!(out, "Your role: {:?}", role);
        }
        None => {
            let _ = writeln!(out, "You are not registered");
        }
    }
    let _ = writeln!(out, "Immunities: {}", list_or_none(&info.immunities));
    let _ = writeln!(out, "Kill deductions: {}", list_or_none(&info.kill_deductions));
    out
}

pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::CycleBuilt(summary) => format!(
            "Hunt cycle built for {}: {} assignments, {} expired\n",
            summary.game, summary.assignments, summary.expired
        ),
        Reply::KillRecorded(outcome) => match (outcome.game_over, outcome.inherited) {
            (true, _) => format!("{} eliminated. Game over!\n", outcome.killed),
            (false, Some(next)) => format!(
                "{} eliminated; hunter continues with {}\n",
                outcome.killed, next
            ),
            (false, None) => format!("{} eliminated\n", outcome.killed),
        },
        Reply::Target(target) => format!("Your target: {}\n", target.name),
        Reply::Leaderboard(entries) => render_leaderboard(entries),
        Reply::Targets(views) => render_targets(views),
        Reply::Correction(Some(name)) => format!("Drew {}\n", name),
        Reply::Correction(None) => "Nobody alive to draw from\n".to_string(),
        Reply::GameInfo(info) => render_game_info(info),
    }
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>, header: &str) -> usize {
    names
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.len())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
