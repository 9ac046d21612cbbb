use std::time::Duration;

use log::{debug, warn};

use crate::error::QueryError;
use crate::packet::RequestPacket;
use crate::query::round_trip;
use crate::registry::HostPort;
use crate::status::strip_colors;

/// Reply line a server sends when the password is wrong.
pub const BAD_PASSWORD: &str = "Bad rconpassword.";

/// How the output of an RCON command is meant to be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RconKind {
    Generic,
    /// Diagnostic dump whose lines go privately to the issuer.
    Dump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconCommand {
    pub kind: RconKind,
    pub text: String,
}

impl RconCommand {
    /// Tag `text` as a dump when its first word is `dump_command`.
    pub fn new(text: impl Into<String>, dump_command: &str) -> Self {
        let text = text.into();
        let is_dump = text
            .split_whitespace()
            .next()
            .map_or(false, |word| !dump_command.is_empty() && word.eq_ignore_ascii_case(dump_command));
        RconCommand {
            kind: if is_dump { RconKind::Dump } else { RconKind::Generic },
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconReply {
    AuthFailed,
    /// The one informational line, color codes stripped.
    SingleLine(String),
    MultiLine(Vec<String>),
    Dump(Vec<String>),
}

/// Classify the payload of an RCON reply.
pub fn classify(payload: &[u8], kind: RconKind) -> RconReply {
    let text = String::from_utf8_lossy(payload);
    let lines: Vec<String> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .map(str::to_owned)
        .collect();

    if lines.iter().any(|l| l == BAD_PASSWORD) {
        return RconReply::AuthFailed;
    }
    if lines.len() == 2 {
        return RconReply::SingleLine(strip_colors(&lines[1]).into_owned());
    }
    match kind {
        RconKind::Dump => RconReply::Dump(lines.into_iter().skip(2).collect()),
        RconKind::Generic => RconReply::MultiLine(lines),
    }
}

/// Run `command` on the server at `address`.
///
/// Performs no authorization of its own; callers gate access.
pub async fn send_rcon(
    address: &HostPort,
    password: &str,
    command: &RconCommand,
    timeout_dur: Duration,
) -> Result<RconReply, QueryError> {
    debug!("rcon {} -> {}", address, command.text);
    let packet = round_trip(
        address,
        RequestPacket::rcon(password, &command.text),
        timeout_dur,
    )
    .await?;

    let reply = classify(packet.body(), command.kind);
    if reply == RconReply::AuthFailed {
        warn!("rcon password rejected by {}", address);
    }
    Ok(reply)
}
