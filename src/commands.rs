//! Chat command dispatch: a fixed table from command name to handler.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, info};

use crate::engine::Engine;
use crate::format::{format_rcon_reply, format_voice_clients};
use crate::rcon::RconReply;

/// One line of output and where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// To wherever the command came from.
    Reply(String),
    /// Only to the user who issued the command.
    Private(String),
}

impl Line {
    pub fn text(&self) -> &str {
        match self {
            Line::Reply(text) | Line::Private(text) => text,
        }
    }
}

fn replies<I: IntoIterator<Item = String>>(lines: I) -> Vec<Line> {
    lines.into_iter().map(Line::Reply).collect()
}

pub struct Context<'a> {
    pub engine: &'a Engine,
    pub dispatcher: &'a Dispatcher,
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    /// Usage line shown by `help`.
    fn help(&self) -> &'static str;

    fn privileged(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line>;
}

pub struct Dispatcher {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
    aliases: BTreeMap<&'static str, &'static str>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Dispatcher {
            commands: BTreeMap::new(),
            aliases: BTreeMap::new(),
        };
        dispatcher.register(Box::new(Help));
        dispatcher.register(Box::new(Servers));
        dispatcher.register(Box::new(Status));
        dispatcher.register(Box::new(Players));
        dispatcher.register(Box::new(Info));
        dispatcher.register(Box::new(Voice));
        dispatcher.register(Box::new(Rcon));
        dispatcher.alias("s", "status");
        dispatcher.alias("p", "players");
        dispatcher
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn alias(&mut self, alias: &'static str, target: &'static str) {
        self.aliases.insert(alias, target);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        let name = self.aliases.get(name).copied().unwrap_or(name);
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| c.as_ref())
    }

    /// Run one line of input such as `status alpha`.
    ///
    /// `authorized` comes from the transport; privileged commands are
    /// refused here without it.
    pub async fn dispatch(&self, engine: &Engine, input: &str, authorized: bool) -> Vec<Line> {
        let input = input.trim();
        let (name, args) = input.split_once(' ').unwrap_or((input, ""));
        let name = name.to_lowercase();
        let args = args.trim();

        let command = match self.get(&name) {
            Some(command) => command,
            None => return vec![Line::Reply(format!("Command not found: {}", name))],
        };
        if command.privileged() && !authorized {
            info!("refused privileged command '{}'", name);
            return vec![Line::Private(
                "You don't have access to that command".to_owned(),
            )];
        }

        debug!("dispatching '{}' with args '{}'", command.name(), args);
        let ctx = Context {
            engine,
            dispatcher: self,
        };
        command.execute(&ctx, args).await
    }
}

struct Help;

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> &'static str {
        ".help [command] - displays this message"
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        if args.is_empty() {
            let mut lines = vec![Line::Reply("Commands:".to_owned())];
            lines.extend(replies(ctx.dispatcher.commands().map(|c| c.help().to_owned())));
            return lines;
        }
        match ctx.dispatcher.get(&args.to_lowercase()) {
            Some(command) => vec![Line::Reply(command.help().to_owned())],
            None => vec![Line::Reply(format!("Command not found: {}", args))],
        }
    }
}

struct Servers;

#[async_trait]
impl Command for Servers {
    fn name(&self) -> &'static str {
        "servers"
    }

    fn help(&self) -> &'static str {
        ".servers - display server list"
    }

    async fn execute(&self, ctx: &Context<'_>, _args: &str) -> Vec<Line> {
        let game: Vec<&str> = ctx.engine.servers.labels().collect();
        let voice: Vec<&str> = ctx.engine.voice_servers.labels().collect();
        vec![
            Line::Reply(format!("Servers: {}", game.join(", "))),
            Line::Reply(format!("TS3 Servers: {}", voice.join(", "))),
        ]
    }
}

struct Status;

#[async_trait]
impl Command for Status {
    fn name(&self) -> &'static str {
        "status"
    }

    fn help(&self) -> &'static str {
        ".status [server] - show server information"
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        replies(ctx.engine.status_lines(args).await)
    }
}

struct Players;

#[async_trait]
impl Command for Players {
    fn name(&self) -> &'static str {
        "players"
    }

    fn help(&self) -> &'static str {
        ".players [server] - show current players on the server"
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        replies(ctx.engine.player_lines(args).await)
    }
}

struct Info;

#[async_trait]
impl Command for Info {
    fn name(&self) -> &'static str {
        "info"
    }

    fn help(&self) -> &'static str {
        ".info [server] - show connection info for a server"
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        let name = args.split_whitespace().next().unwrap_or("");
        let line = match ctx.engine.servers.resolve(name) {
            Ok(entry) => format!(
                "{} connection info: /connect {}",
                entry.label, entry.address
            ),
            Err(e) => e.to_string(),
        };
        vec![Line::Reply(line)]
    }
}

struct Voice;

#[async_trait]
impl Command for Voice {
    fn name(&self) -> &'static str {
        "ts3"
    }

    fn help(&self) -> &'static str {
        ".ts3 [server] - show people connected to a ts3 server"
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        let line = match ctx.engine.voice_clients(args).await {
            Ok((label, clients)) => format_voice_clients(&label, &clients),
            Err(e) => format!("Could not query TS3 server '{}': {}", args, e),
        };
        vec![Line::Reply(line)]
    }
}

struct Rcon;

#[async_trait]
impl Command for Rcon {
    fn name(&self) -> &'static str {
        "rcon"
    }

    fn help(&self) -> &'static str {
        ".rcon [server] [command] [args...] - send an rcon command to a server"
    }

    fn privileged(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &Context<'_>, args: &str) -> Vec<Line> {
        let (name, command) = match args.split_once(' ') {
            Some((name, command)) if !command.trim().is_empty() => (name, command.trim()),
            _ => return vec![Line::Reply(self.help().to_owned())],
        };

        match ctx.engine.rcon(name, command).await {
            Ok((label, command, reply)) => {
                let lines = format_rcon_reply(&label, &command.text, &reply);
                match reply {
                    RconReply::Dump(_) => lines.into_iter().map(Line::Private).collect(),
                    _ => replies(lines),
                }
            }
            Err(e) => vec![Line::Reply(e.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::{HostPort, Registry};

    fn engine() -> Engine {
        let servers: Registry<HostPort> =
            Registry::parse_list("Alpha 127.0.0.1:1\nAlpha Two 127.0.0.1:2\n").unwrap();
        let voice = Registry::parse_list("Main ts.example.org:1\n").unwrap();
        Engine::new(&Config::default(), servers, voice)
    }

    #[tokio::test]
    async fn unknown_command() {
        let lines = Dispatcher::new().dispatch(&engine(), "frobnicate x", false).await;
        assert_eq!(lines, vec![Line::Reply("Command not found: frobnicate".into())]);
    }

    #[tokio::test]
    async fn rcon_requires_authorization() {
        let lines = Dispatcher::new()
            .dispatch(&engine(), "rcon alpha map dm6", false)
            .await;
        assert_eq!(
            lines,
            vec![Line::Private("You don't have access to that command".into())]
        );
    }

    #[tokio::test]
    async fn rcon_usage_without_command() {
        let lines = Dispatcher::new().dispatch(&engine(), "rcon alpha", true).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text().starts_with(".rcon"));
    }

    #[tokio::test]
    async fn info_and_ambiguity() {
        let dispatcher = Dispatcher::new();
        let engine = engine();
        assert_eq!(
            dispatcher.dispatch(&engine, "info two", false).await,
            vec![Line::Reply(
                "Alpha Two connection info: /connect 127.0.0.1:2".into()
            )]
        );
        assert_eq!(
            dispatcher.dispatch(&engine, "info alp", false).await,
            vec![Line::Reply(
                "There are multiple matches for 'alp': Alpha, Alpha Two".into()
            )]
        );
    }

    #[tokio::test]
    async fn servers_and_aliases() {
        let dispatcher = Dispatcher::new();
        let lines = dispatcher.dispatch(&engine(), "SERVERS", false).await;
        assert_eq!(
            lines,
            vec![
                Line::Reply("Servers: Alpha, Alpha Two".into()),
                Line::Reply("TS3 Servers: Main".into()),
            ]
        );
        assert_eq!(dispatcher.get("s").map(|c| c.name()), Some("status"));
        assert_eq!(dispatcher.get("p").map(|c| c.name()), Some("players"));
    }

    #[tokio::test]
    async fn help_lists_every_command() {
        let dispatcher = Dispatcher::new();
        let lines = dispatcher.dispatch(&engine(), "help", false).await;
        assert_eq!(lines.len(), 1 + dispatcher.commands().count());
        let lines = dispatcher.dispatch(&engine(), "help s", false).await;
        assert_eq!(
            lines,
            vec![Line::Reply(".status [server] - show server information".into())]
        );
    }
}
