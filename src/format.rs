//! Text rendering of query results. Everything here is pure.

use crate::rcon::RconReply;
use crate::status::StatusRecord;

/// Width of the `(gamemode)` column.
pub const MODE_WIDTH: usize = 7;
/// Width of the `players/max` column when a clan annotation follows it.
pub const COUNT_WIDTH: usize = 8;
/// Width of the `(N CLAN)` annotation.
pub const CLAN_WIDTH: usize = 12;
/// Width of the `players/max` column with no clan annotation.
pub const WIDE_COUNT_WIDTH: usize = COUNT_WIDTH + CLAN_WIDTH;

fn label_column(label: &str, longest_width: usize) -> String {
    format!("{:<width$}", format!("{}:", label), width = longest_width + 2)
}

/// `Players on <label> (<n>/<max>): a, b, ...`
pub fn format_player_list(label: &str, record: &StatusRecord) -> String {
    if record.players.is_empty() {
        return format!("There are no players on {}", label);
    }
    let names: Vec<String> = record.players.iter().map(|p| p.display_name()).collect();
    format!(
        "Players on {} ({}/{}): {}",
        label,
        record.players.len(),
        record.max_clients(),
        names.join(", ")
    )
}

/// One aligned line of a status listing.
///
/// `longest_width` must be computed once for the whole batch so every
/// line's label column lines up.
pub fn format_status_line(
    label: &str,
    record: &StatusRecord,
    longest_width: usize,
    clan_tag: &str,
) -> String {
    let mode = match record.gamemode {
        Some(mode) => format!("({})", mode),
        None => "(?)".to_owned(),
    };
    let count = format!("{}/{}", record.players.len(), record.max_clients());
    let clan_count = record.clan_count(clan_tag);

    if clan_count > 0 {
        let clan = format!("({} {})", clan_count, clan_tag);
        format!(
            "{:<mw$}{} {:<cw$}{:<tw$} {}",
            mode,
            label_column(label, longest_width),
            count,
            clan,
            record.map_name(),
            mw = MODE_WIDTH,
            cw = COUNT_WIDTH,
            tw = CLAN_WIDTH,
        )
    } else {
        format!(
            "{:<mw$}{} {:<cw$} {}",
            mode,
            label_column(label, longest_width),
            count,
            record.map_name(),
            mw = MODE_WIDTH,
            cw = WIDE_COUNT_WIDTH,
        )
    }
}

/// Status line for a server that did not answer.
pub fn format_down(label: &str, longest_width: usize) -> String {
    format!(
        "{:<mw$}{} SERVER IS DOWN",
        "(N/A)",
        label_column(label, longest_width),
        mw = MODE_WIDTH
    )
}

/// Status line for a server that answered with something unusable.
pub fn format_broken(label: &str, longest_width: usize, reason: &str) -> String {
    format!(
        "{:<mw$}{} {}",
        "(ERR)",
        label_column(label, longest_width),
        reason,
        mw = MODE_WIDTH
    )
}

/// Players listing for a server that did not answer.
pub fn format_players_down(label: &str) -> String {
    format!("{} is down", label)
}

pub fn format_voice_clients(label: &str, clients: &[String]) -> String {
    format!(
        "{} clients on {} TS3: {}",
        clients.len(),
        label,
        clients.join(", ")
    )
}

/// Lines to show for an RCON reply. Dump lines are returned as-is; the
/// caller decides where they go.
pub fn format_rcon_reply(label: &str, command: &str, reply: &RconReply) -> Vec<String> {
    match reply {
        RconReply::AuthFailed => vec!["Bad rconpassword".to_owned()],
        RconReply::SingleLine(line) => vec![line.clone()],
        RconReply::Dump(lines) => lines.clone(),
        RconReply::MultiLine(_) => vec![format!("{} command sent to {}", command, label)],
    }
}
