use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;

lazy_static! {
    static ref COLOR_CODE: Regex = Regex::new(r"\^[0-9-]").unwrap();
}

/// Remove `^N` / `^-` color escapes from server text.
pub fn strip_colors(text: &str) -> Cow<'_, str> {
    COLOR_CODE.replace_all(text, "")
}

/// Game modes in `g_gametype` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    FreeForAll,
    LastManStanding,
    /// Index 2 has no mode of its own.
    Unused,
    TeamDeathmatch,
    TeamSurvivor,
    FollowTheLeader,
    CaptureAndHold,
    CaptureTheFlag,
    Bomb,
    Jump,
}

impl GameMode {
    pub const TABLE: [GameMode; 10] = [
        GameMode::FreeForAll,
        GameMode::LastManStanding,
        GameMode::Unused,
        GameMode::TeamDeathmatch,
        GameMode::TeamSurvivor,
        GameMode::FollowTheLeader,
        GameMode::CaptureAndHold,
        GameMode::CaptureTheFlag,
        GameMode::Bomb,
        GameMode::Jump,
    ];

    pub fn from_index(index: usize) -> Option<GameMode> {
        Self::TABLE.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameMode::FreeForAll => "FFA",
            GameMode::LastManStanding => "LMS",
            GameMode::Unused => "",
            GameMode::TeamDeathmatch => "TDM",
            GameMode::TeamSurvivor => "TS",
            GameMode::FollowTheLeader => "FTL",
            GameMode::CaptureAndHold => "C&H",
            GameMode::CaptureTheFlag => "CTF",
            GameMode::Bomb => "BOMB",
            GameMode::Jump => "JUMP",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl PartialEq<&str> for GameMode {
    fn eq(&self, other: &&str) -> bool {
        self.label() == *other
    }
}

/// One line of the player list: `<score> <ping> "<name>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    pub score: i32,
    pub ping: i32,
    /// Name as sent by the server, color codes included.
    pub name: String,
    /// The whole line, untouched.
    pub raw: String,
}

impl PlayerEntry {
    pub fn parse(line: &str) -> Result<PlayerEntry, ParseError> {
        let malformed = || ParseError::MalformedPlayerLine(line.to_owned());

        let rest = line.trim();
        let (score, rest) = rest.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let (ping, rest) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(malformed)?;
        let score: i32 = score.parse().map_err(|_| malformed())?;
        let ping: i32 = ping.parse().map_err(|_| malformed())?;

        let quoted = rest.trim();
        let name = quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or_else(malformed)?;

        Ok(PlayerEntry {
            score,
            ping,
            name: name.to_owned(),
            raw: line.to_owned(),
        })
    }

    /// Name with color codes removed.
    pub fn display_name(&self) -> String {
        strip_colors(&self.name).into_owned()
    }
}

/// A decoded `statusResponse`. Only [parse_status] builds one, so the
/// required fields are always there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub variables: HashMap<String, String>,
    pub players: Vec<PlayerEntry>,
    /// `None` when the server does not report `g_gametype`.
    pub gamemode: Option<GameMode>,
    max_clients: String,
    map_name: String,
}

impl StatusRecord {
    /// `sv_maxclients` as reported.
    pub fn max_clients(&self) -> &str {
        &self.max_clients
    }

    /// `mapname` as reported.
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Number of player lines containing `tag` anywhere in the raw text.
    pub fn clan_count(&self, tag: &str) -> usize {
        if tag.is_empty() {
            return 0;
        }
        self.players.iter().filter(|p| p.raw.contains(tag)).count()
    }
}

/// Decode a status payload (out-of-band marker already stripped).
///
/// Line 0 is the `statusResponse` echo, line 1 the `\key\value` block and
/// every following non-blank line a player.
pub fn parse_status(payload: &[u8]) -> Result<StatusRecord, ParseError> {
    let text = String::from_utf8_lossy(payload);
    let mut lines = text.split('\n');

    // protocol echo
    lines.next();
    let var_line = lines.next().ok_or(ParseError::MalformedVariableBlock)?;
    let variables = parse_variables(var_line.trim_end_matches('\r'))?;

    let required = |field: &str| {
        variables
            .get(field)
            .cloned()
            .ok_or_else(|| ParseError::MissingField(field.to_owned()))
    };
    let max_clients = required("sv_maxclients")?;
    let map_name = required("mapname")?;

    let gamemode = match variables.get("g_gametype") {
        Some(raw) => {
            let mode = raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(GameMode::from_index)
                .ok_or_else(|| ParseError::InvalidGameMode(raw.clone()))?;
            Some(mode)
        }
        None => None,
    };

    let players = lines
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .map(PlayerEntry::parse)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StatusRecord {
        variables,
        players,
        gamemode,
        max_clients,
        map_name,
    })
}

fn parse_variables(line: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut tokens = line.split('\\');
    if tokens.next() != Some("") {
        return Err(ParseError::MalformedVariableBlock);
    }
    let tokens: Vec<&str> = tokens.collect();
    if tokens.len() % 2 != 0 {
        return Err(ParseError::MalformedVariableBlock);
    }
    Ok(tokens
        .chunks(2)
        .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(vars: &str, players: &[&str]) -> Vec<u8> {
        let mut text = format!("statusResponse\n{}\n", vars);
        for p in players {
            text.push_str(p);
            text.push('\n');
        }
        text.into_bytes()
    }

    #[test]
    fn parses_synthetic_status() {
        let data = payload(
            r"\sv_maxclients\16\mapname\dm6\g_gametype\3",
            &[r#"10 50 "^1Red^7Player""#, r#"0 999 "Spectator""#],
        );
        let record = parse_status(&data).unwrap();
        assert_eq!(record.variables["mapname"], "dm6");
        assert_eq!(record.gamemode, Some(GameMode::TeamDeathmatch));
        assert!(record.gamemode.unwrap() == "TDM");
        assert_eq!(record.players.len(), 2);
        assert_eq!(record.max_clients(), "16");

        let first = &record.players[0];
        assert_eq!(first.score, 10);
        assert_eq!(first.ping, 50);
        assert_eq!(first.name, "^1Red^7Player");
        assert_eq!(first.display_name(), "RedPlayer");
    }

    #[test]
    fn required_fields_outlive_variable_edits() {
        let data = payload(r"\sv_maxclients\16\mapname\dm6", &[]);
        let mut record = parse_status(&data).unwrap();
        record.variables.clear();
        assert_eq!(record.max_clients(), "16");
        assert_eq!(record.map_name(), "dm6");
    }

    #[test]
    fn names_with_spaces_survive() {
        let player = PlayerEntry::parse(r#"-3  120 "The Big ^2One""#).unwrap();
        assert_eq!(player.score, -3);
        assert_eq!(player.display_name(), "The Big One");
    }

    #[test]
    fn empty_server() {
        let record = parse_status(&payload(r"\sv_maxclients\8\mapname\ut4_casa", &[])).unwrap();
        assert!(record.players.is_empty());
        assert_eq!(record.gamemode, None);
    }

    #[test]
    fn gamemode_out_of_range() {
        let data = payload(r"\sv_maxclients\16\mapname\dm6\g_gametype\99", &[]);
        assert_eq!(
            parse_status(&data),
            Err(ParseError::InvalidGameMode("99".into()))
        );
        let data = payload(r"\sv_maxclients\16\mapname\dm6\g_gametype\ctf", &[]);
        assert!(matches!(
            parse_status(&data),
            Err(ParseError::InvalidGameMode(_))
        ));
    }

    #[test]
    fn missing_fields() {
        let data = payload(r"\sv_maxclients\16\g_gametype\3", &[]);
        assert_eq!(
            parse_status(&data),
            Err(ParseError::MissingField("mapname".into()))
        );
        let data = payload(r"\mapname\dm6", &[]);
        assert_eq!(
            parse_status(&data),
            Err(ParseError::MissingField("sv_maxclients".into()))
        );
    }

    #[test]
    fn odd_variable_block() {
        let data = payload(r"\sv_maxclients\16\mapname", &[]);
        assert_eq!(parse_status(&data), Err(ParseError::MalformedVariableBlock));
        assert_eq!(
            parse_status(b"statusResponse"),
            Err(ParseError::MalformedVariableBlock)
        );
    }

    #[test]
    fn bad_player_line() {
        let data = payload(r"\sv_maxclients\16\mapname\dm6", &["abc 12 \"x\""]);
        assert!(matches!(
            parse_status(&data),
            Err(ParseError::MalformedPlayerLine(_))
        ));
    }

    #[test]
    fn clan_count_uses_raw_text() {
        let data = payload(
            r"\sv_maxclients\16\mapname\dm6",
            &[
                r#"1 20 "^1CLANTAG^7Player""#,
                r#"2 30 "CLANTAGmate""#,
                r#"3 40 "CLAN^2TAG""#,
                r#"4 50 "Random""#,
            ],
        );
        let record = parse_status(&data).unwrap();
        assert_eq!(record.clan_count("CLANTAG"), 2);
        assert_eq!(record.clan_count(""), 0);
    }

    #[test]
    fn strips_colors() {
        assert_eq!(strip_colors("^1Red^-^7White^a"), "RedWhite^a");
    }
}
