use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::error::{ConfigError, ResolutionError};

/// A `host:port` pair. The port is always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        HostPort { host: host.into(), port }
    }
}

impl FromStr for HostPort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidAddress(s.to_owned()))?;
        if host.is_empty() {
            return Err(ConfigError::InvalidAddress(s.to_owned()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(s.to_owned()))?;
        Ok(HostPort::new(host, port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where a voice server's query interface lives: a host and the virtual server to select.
///
/// Written as `host:virtual_server_id` in the config; the query port comes from
/// the config as well since every virtual server shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceAddress {
    pub host: String,
    pub virtual_server_id: String,
}

impl FromStr for VoiceAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.rsplit_once(':') {
            Some((host, id)) if !host.is_empty() && !id.is_empty() => Ok(VoiceAddress {
                host: host.to_owned(),
                virtual_server_id: id.to_owned(),
            }),
            _ => Err(ConfigError::InvalidAddress(s.to_owned())),
        }
    }
}

impl fmt::Display for VoiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.virtual_server_id)
    }
}

/// Case folding shared by lookup and de-duplication.
fn fold(label: &str) -> String {
    label.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry<A> {
    pub label: String,
    pub address: A,
}

/// Ordered label -> address table. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry<A> {
    entries: Vec<ServerEntry<A>>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Registry { entries: Vec::new() }
    }
}

impl<A> Registry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, keeping load order. A label that is already present
    /// (case-insensitively) keeps its position and takes the new address.
    pub fn insert(&mut self, label: impl Into<String>, address: A) {
        let label = label.into();
        let existing = self
            .entries
            .iter()
            .position(|e| fold(&e.label) == fold(&label));
        match existing {
            Some(i) => {
                warn!("duplicate server label '{}', replacing its address", label);
                self.entries[i].address = address;
            }
            None => self.entries.push(ServerEntry { label, address }),
        }
    }

    pub fn entries(&self) -> &[ServerEntry<A>] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Width of the longest label, in characters.
    pub fn longest_label_width(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// Resolve user input to exactly one entry.
    ///
    /// An exact case-insensitive match wins outright. Otherwise every label
    /// containing the query is a candidate, and there must be exactly one.
    pub fn resolve(&self, query: &str) -> Result<&ServerEntry<A>, ResolutionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::Empty);
        }
        let needle = fold(query);

        let mut matches: Vec<&ServerEntry<A>> = Vec::new();
        for entry in &self.entries {
            let label = fold(&entry.label);
            if label == needle {
                return Ok(entry);
            }
            if label.contains(&needle) {
                matches.push(entry);
            }
        }

        match matches.len() {
            0 => Err(ResolutionError::NotFound(query.to_owned())),
            1 => Ok(matches[0]),
            _ => Err(ResolutionError::Ambiguous(
                query.to_owned(),
                matches.iter().map(|e| e.label.clone()).collect(),
            )),
        }
    }
}

impl<A: FromStr<Err = ConfigError>> Registry<A> {
    /// Parse a server list: one `<label words...> <address>` per line.
    /// Blank lines and `#` comments are skipped.
    pub fn parse_list(text: &str) -> Result<Self, ConfigError> {
        let mut registry = Registry::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (label, address) = line
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| ConfigError::InvalidServerLine(line.to_owned()))?;
            let label = label.trim();
            if label.is_empty() {
                return Err(ConfigError::InvalidServerLine(line.to_owned()));
            }
            registry.insert(label, address.parse()?);
        }
        Ok(registry)
    }
}

impl<A> FromIterator<(String, A)> for Registry<A> {
    fn from_iter<I: IntoIterator<Item = (String, A)>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for (label, address) in iter {
            registry.insert(label, address);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(labels: &[&str]) -> Registry<HostPort> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.to_string(), HostPort::new("127.0.0.1", 27960 + i as u16)))
            .collect()
    }

    #[test]
    fn exact_match_beats_substrings() {
        let reg = registry(&["Server A", "Server AB", "Server ABC"]);
        let entry = reg.resolve("server ab").unwrap();
        assert_eq!(entry.label, "Server AB");
        assert_eq!(entry.address.port, 27961);
    }

    #[test]
    fn exact_match_after_partial_match_wins() {
        let reg = registry(&["Server AB", "Server A"]);
        let entry = reg.resolve("server a").unwrap();
        assert_eq!(entry.label, "Server A");
        assert_eq!(entry.address.port, 27961);
    }

    #[test]
    fn non_ascii_labels_fold_alike() {
        let mut reg = registry(&["Über Server", "Other"]);
        reg.insert("ÜBER SERVER", HostPort::new("10.0.0.7", 2));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.entries()[0].address.host, "10.0.0.7");
        assert_eq!(reg.resolve("über server").unwrap().label, "Über Server");
        assert_eq!(reg.resolve("ÜBER").unwrap().label, "Über Server");
    }

    #[test]
    fn ambiguous_lists_candidates_in_load_order() {
        let reg = registry(&["Server AB", "Other", "Server ABC"]);
        assert_eq!(
            reg.resolve("server a"),
            Err(ResolutionError::Ambiguous(
                "server a".into(),
                vec!["Server AB".into(), "Server ABC".into()]
            ))
        );
    }

    #[test]
    fn empty_and_unmatched() {
        let reg = registry(&["Alpha"]);
        assert_eq!(reg.resolve(""), Err(ResolutionError::Empty));
        assert_eq!(reg.resolve("   "), Err(ResolutionError::Empty));
        assert_eq!(
            reg.resolve("zeta"),
            Err(ResolutionError::NotFound("zeta".into()))
        );
    }

    #[test]
    fn unique_substring_resolves() {
        let reg = registry(&["Alpha CTF", "Beta TS"]);
        assert_eq!(reg.resolve("ctf").unwrap().label, "Alpha CTF");
    }

    #[test]
    fn longest_label() {
        assert_eq!(registry(&[]).longest_label_width(), 0);
        assert_eq!(registry(&["A", "ServerLongName"]).longest_label_width(), 14);
    }

    #[test]
    fn parse_server_list() {
        let text = "# comment\nUS East CTF 10.0.0.1:27960\n\nEU 1 eu.example.org:27961\n";
        let reg: Registry<HostPort> = Registry::parse_list(text).unwrap();
        let labels: Vec<&str> = reg.labels().collect();
        assert_eq!(labels, vec!["US East CTF", "EU 1"]);
        assert_eq!(reg.entries()[1].address, HostPort::new("eu.example.org", 27961));
    }

    #[test]
    fn parse_server_list_rejects_bad_lines() {
        assert!(Registry::<HostPort>::parse_list("lonely-token\n").is_err());
        assert!(Registry::<HostPort>::parse_list("Name host:notaport\n").is_err());
    }

    #[test]
    fn host_port_requires_port() {
        assert!("example.org".parse::<HostPort>().is_err());
        assert!(":27960".parse::<HostPort>().is_err());
        assert_eq!(
            "example.org:27960".parse::<HostPort>().unwrap().to_string(),
            "example.org:27960"
        );
    }

    #[test]
    fn duplicate_label_keeps_position() {
        let mut reg = registry(&["One", "Two"]);
        reg.insert("one", HostPort::new("10.0.0.9", 1));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.entries()[0].address.host, "10.0.0.9");
    }

    #[test]
    fn voice_address() {
        let addr: VoiceAddress = "ts.example.org:3".parse().unwrap();
        assert_eq!(addr.host, "ts.example.org");
        assert_eq!(addr.virtual_server_id, "3");
    }
}
