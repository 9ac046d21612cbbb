//! Client for the TeamSpeak 3 ServerQuery interface.
//!
//! The protocol is line based over TCP: the server greets with `TS3` and a
//! welcome banner, then answers every command with zero or more data lines
//! followed by an `error id=<n> msg=<text>` terminator.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::QueryError;

pub const DEFAULT_QUERY_PORT: u16 = 10011;

const GREETING: &str = "TS3";

/// Display names of the real users connected to a virtual server.
pub type VoiceClientList = Vec<String>;

/// Connect to `host:query_port`, select `virtual_server_id` and list its clients.
///
/// Query connections (ours included) are left out of the result.
/// `timeout_dur` bounds the whole session, from connect to the last line.
pub async fn list_clients(
    host: &str,
    query_port: u16,
    virtual_server_id: &str,
    timeout_dur: Duration,
) -> Result<VoiceClientList, QueryError> {
    timeout(timeout_dur, session(host, query_port, virtual_server_id)).await?
}

async fn session(
    host: &str,
    query_port: u16,
    virtual_server_id: &str,
) -> Result<VoiceClientList, QueryError> {
    let mut conn = QueryConnection::connect(host, query_port).await?;
    conn.command(&format!("use sid={}", escape(virtual_server_id)))
        .await?;
    let data = conn.command("clientlist").await?;
    conn.quit().await;

    Ok(parse_clientlist(&data.join("")))
}

struct QueryConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl QueryConnection {
    async fn connect(host: &str, port: u16) -> Result<Self, QueryError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(QueryError::ConnectionFailed)?;
        let (read_half, writer) = stream.into_split();
        let mut conn = QueryConnection {
            reader: BufReader::new(read_half),
            writer,
        };

        let greeting = conn.read_line().await?;
        if greeting != GREETING {
            return Err(QueryError::MalformedFraming(format!(
                "unexpected greeting '{}'",
                greeting
            )));
        }
        // welcome banner
        conn.read_line().await?;
        Ok(conn)
    }

    async fn read_line(&mut self) -> Result<String, QueryError> {
        loop {
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(QueryError::ReceiveFailed)?;
            if n == 0 {
                return Err(QueryError::MalformedFraming(
                    "connection closed mid-response".to_owned(),
                ));
            }
            // lines end in "\n\r", so the '\r' shows up at the front of the next one
            let line = line.trim_matches(|c| c == '\r' || c == '\n');
            if !line.is_empty() {
                return Ok(line.to_owned());
            }
        }
    }

    /// Send `command` and collect its data lines up to the `error` terminator.
    async fn command(&mut self, command: &str) -> Result<Vec<String>, QueryError> {
        debug!("ts3 -> {}", command);
        let framed = format!("{}\n", command);
        self.writer
            .write_all(framed.as_bytes())
            .await
            .map_err(QueryError::SendFailed)?;

        let mut data = Vec::new();
        loop {
            let line = self.read_line().await?;
            if let Some((id, message)) = parse_error_line(&line) {
                if id != 0 {
                    return Err(QueryError::Rejected { id, message });
                }
                return Ok(data);
            }
            data.push(line);
        }
    }

    async fn quit(&mut self) {
        let _ = self.writer.write_all(b"quit\n").await;
    }
}

/// `error id=0 msg=ok` -> `Some((0, "ok"))`; any other line -> `None`.
fn parse_error_line(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix("error ")?;
    let fields = parse_fields(rest);
    let id = fields.get("id")?.parse().ok()?;
    let message = fields.get("msg").cloned().unwrap_or_default();
    Some((id, message))
}

fn parse_fields(entry: &str) -> HashMap<&str, String> {
    entry
        .split(' ')
        .filter(|f| !f.is_empty())
        .map(|field| match field.split_once('=') {
            Some((key, value)) => (key, unescape(value)),
            None => (field, String::new()),
        })
        .collect()
}

fn is_placeholder(fields: &HashMap<&str, String>) -> bool {
    let query_client = fields.get("client_type").map_or(false, |t| t == "1");
    let unknown = fields
        .get("client_nickname")
        .map_or(true, |name| name.contains("Unknown"));
    query_client || unknown
}

/// Parse the body of a `clientlist` reply into display names.
pub fn parse_clientlist(body: &str) -> VoiceClientList {
    body.split('|')
        .map(parse_fields)
        .filter(|fields| !is_placeholder(fields))
        .filter_map(|mut fields| fields.remove("client_nickname"))
        .collect()
}

pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('/') => out.push('/'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some('f') => out.push('\x0c'),
            Some('b') => out.push('\x08'),
            Some('a') => out.push('\x07'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_values() {
        assert_eq!(unescape(r"John\sDoe\p\/x\\y"), r"John Doe|/x\y");
        assert_eq!(escape("John Doe|x"), r"John\sDoe\px");
    }

    #[test]
    fn error_line() {
        assert_eq!(parse_error_line("error id=0 msg=ok"), Some((0, "ok".into())));
        assert_eq!(
            parse_error_line(r"error id=1024 msg=invalid\sserverID"),
            Some((1024, "invalid serverID".into()))
        );
        assert_eq!(parse_error_line("clid=1 cid=1"), None);
    }

    #[test]
    fn clientlist_skips_query_clients() {
        let body = concat!(
            r"clid=1 cid=1 client_database_id=1 client_nickname=Unknown\sfrom\s127.0.0.1:5123 client_type=1|",
            r"clid=5 cid=2 client_database_id=9 client_nickname=Big\sBob client_type=0|",
            r"clid=6 cid=2 client_database_id=10 client_nickname=serveradmin client_type=1|",
            r"clid=7 cid=3 client_database_id=11 client_nickname=alice client_type=0"
        );
        assert_eq!(parse_clientlist(body), vec!["Big Bob", "alice"]);
        assert!(parse_clientlist("").is_empty());
    }
}
