use std::time::Duration;

use log::warn;
use tokio::task::JoinError;

use crate::config::Config;
use crate::error::Error;
use crate::format::{
    format_broken, format_down, format_player_list, format_players_down, format_status_line,
};
use crate::query::query_status;
use crate::rcon::{send_rcon, RconCommand, RconReply};
use crate::registry::{HostPort, Registry, ServerEntry, VoiceAddress};
use crate::status::{parse_status, StatusRecord};
use crate::voice::{list_clients, VoiceClientList};

const STATUS_COMMAND: &str = "getstatus";

/// The outcome of querying one server in a batch.
pub type ServerResult = (String, Result<StatusRecord, Error>);

/// Read-only state shared by every query: the registries and the settings
/// the core needs. Built once at start-up.
#[derive(Debug, Clone)]
pub struct Engine {
    pub servers: Registry<HostPort>,
    pub voice_servers: Registry<VoiceAddress>,
    pub rcon_password: String,
    pub clan_tag: String,
    pub dump_command: String,
    pub voice_query_port: u16,
    pub timeout: Duration,
}

impl Engine {
    pub fn new(
        config: &Config,
        servers: Registry<HostPort>,
        voice_servers: Registry<VoiceAddress>,
    ) -> Self {
        Engine {
            servers,
            voice_servers,
            rcon_password: config.rcon_password.clone(),
            clan_tag: config.clan_tag.clone(),
            dump_command: config.dump_command.clone(),
            voice_query_port: config.voice_query_port,
            timeout: config.timeout(),
        }
    }

    /// One `getstatus` round-trip, parsed.
    pub async fn fetch_status(
        address: &HostPort,
        timeout_dur: Duration,
    ) -> Result<StatusRecord, Error> {
        let payload = query_status(address, STATUS_COMMAND, timeout_dur).await?;
        Ok(parse_status(&payload)?)
    }

    /// Query every entry concurrently. Results come back in the order of
    /// `entries`, not in completion order.
    pub async fn fetch_all(&self, entries: &[ServerEntry<HostPort>]) -> Vec<ServerResult> {
        let handles: Vec<_> = entries
            .iter()
            .map(|entry| {
                let address = entry.address.clone();
                let timeout_dur = self.timeout;
                tokio::spawn(async move { Self::fetch_status(&address, timeout_dur).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (entry, handle) in entries.iter().zip(handles) {
            let result = task_outcome(handle.await);
            if let Err(e) = &result {
                warn!("{} ({}): {}", entry.label, entry.address, e);
            }
            results.push((entry.label.clone(), result));
        }
        results
    }

    /// Entries named by `name`, or the whole registry when `name` is empty.
    fn targets(&self, name: &str) -> Result<Vec<ServerEntry<HostPort>>, Error> {
        if name.trim().is_empty() {
            Ok(self.servers.entries().to_vec())
        } else {
            Ok(vec![self.servers.resolve(name)?.clone()])
        }
    }

    /// Aligned status lines for one server or, with an empty `name`, all of them.
    pub async fn status_lines(&self, name: &str) -> Vec<String> {
        let targets = match self.targets(name) {
            Ok(targets) => targets,
            Err(e) => return vec![e.to_string()],
        };
        // computed over the full registry so single and batch listings align alike
        let width = self.servers.longest_label_width();

        self.fetch_all(&targets)
            .await
            .into_iter()
            .map(|(label, result)| self.status_line(&label, result, width))
            .collect()
    }

    fn status_line(&self, label: &str, result: Result<StatusRecord, Error>, width: usize) -> String {
        match result {
            Ok(record) => format_status_line(label, &record, width, &self.clan_tag),
            Err(Error::Query(_)) => format_down(label, width),
            Err(e) => format_broken(label, width, &e.to_string()),
        }
    }

    /// Player listings for one server or, with an empty `name`, all of them.
    pub async fn player_lines(&self, name: &str) -> Vec<String> {
        let targets = match self.targets(name) {
            Ok(targets) => targets,
            Err(e) => return vec![e.to_string()],
        };

        self.fetch_all(&targets)
            .await
            .into_iter()
            .map(|(label, result)| match result {
                Ok(record) => format_player_list(&label, &record),
                Err(Error::Query(_)) => format_players_down(&label),
                Err(e) => format!("{}: {}", label, e),
            })
            .collect()
    }

    /// Run an RCON command on the server named by `name`.
    pub async fn rcon(
        &self,
        name: &str,
        command: &str,
    ) -> Result<(String, RconCommand, RconReply), Error> {
        let entry = self.servers.resolve(name)?;
        let command = RconCommand::new(command, &self.dump_command);
        let reply = send_rcon(&entry.address, &self.rcon_password, &command, self.timeout).await?;
        Ok((entry.label.clone(), command, reply))
    }

    /// Clients connected to the voice server named by `name`.
    pub async fn voice_clients(&self, name: &str) -> Result<(String, VoiceClientList), Error> {
        let entry = self.voice_servers.resolve(name)?;
        let clients = list_clients(
            &entry.address.host,
            self.voice_query_port,
            &entry.address.virtual_server_id,
            self.timeout,
        )
        .await?;
        Ok((entry.label.clone(), clients))
    }
}

/// A query task that panicked or was cancelled is not a network failure.
fn task_outcome(joined: Result<Result<StatusRecord, Error>, JoinError>) -> Result<StatusRecord, Error> {
    joined.unwrap_or_else(|e| Err(Error::Task(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    fn engine() -> Engine {
        let servers: Registry<HostPort> = Registry::parse_list("Alpha 127.0.0.1:1\n").unwrap();
        Engine::new(&Config::default(), servers, Registry::new())
    }

    async fn panicking_query() -> Result<StatusRecord, Error> {
        panic!("boom")
    }

    #[tokio::test]
    async fn failed_task_is_not_shown_as_down() {
        let joined = tokio::spawn(panicking_query()).await;
        let outcome = task_outcome(joined);
        assert!(matches!(outcome, Err(Error::Task(_))));

        let line = engine().status_line("Alpha", outcome, 5);
        assert!(line.starts_with("(ERR)  Alpha:"), "{}", line);
        assert!(!line.contains("SERVER IS DOWN"));
    }

    #[test]
    fn query_failure_is_shown_as_down() {
        let line = engine().status_line("Alpha", Err(QueryError::Timeout.into()), 5);
        assert_eq!(line, "(N/A)  Alpha:  SERVER IS DOWN");
    }
}
