//! Runs registered secure commands without leaving their text in any log.
//!
//! Dispatch happens in two phases. The intercept methods decide
//! synchronously whether the host must cancel its default handling (and with
//! it the audit line), and queue the real work. [`SecureCommandGate::run_pending`]
//! performs that work on the host's next tick.

use crate::log_filter::unqualified;
use crate::{
    CommandExecutor, CommandMap, CommandSender, CommandStub, LogSink, SensitiveCommands,
    TabCompleter, UserId, WhisperConfig, install_log_filters,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A command whose invocations must never be logged.
#[derive(Clone)]
pub struct SecureCommand {
    /// Primary command name.
    pub name: String,
    /// One-line description shown by the host's help.
    pub description: String,
    /// Usage text.
    pub usage: String,
    /// Alternative names, each as sensitive as `name`.
    pub aliases: Vec<String>,
    /// Runs the command once the gate dispatches it.
    pub executor: Arc<dyn CommandExecutor>,
    /// Suggestions offered through the host's completion stub.
    pub completer: Option<Arc<dyn TabCompleter>>,
}

impl SecureCommand {
    /// Runs the command's executor.
    pub fn execute(&self, sender: CommandSender, label: &str, args: &[String]) -> bool {
        self.executor.execute(sender, label, args)
    }

    /// Asks the command's completer for suggestions, if it has one.
    pub fn tab_complete(&self, sender: CommandSender, alias: &str, args: &[String]) -> Vec<String> {
        self.completer
            .as_ref()
            .map(|completer| completer.complete(sender, alias, args))
            .unwrap_or_default()
    }

    fn stub(&self) -> CommandStub {
        CommandStub {
            name: self.name.clone(),
            description: self.description.clone(),
            usage: self.usage.clone(),
            aliases: self.aliases.clone(),
            completer: self.completer.clone(),
        }
    }
}

/// What the host must do with a command line after interception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interception {
    /// Cancel default handling. The command runs on the next tick.
    Suppressed,
    /// Not a secure command; handle it normally.
    PassThrough,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Player,
    Console,
}

struct PendingDispatch {
    command: Arc<SecureCommand>,
    sender: CommandSender,
    label: String,
    raw_args: String,
    channel: Channel,
}

/// Registry of secure commands plus their deferred dispatch queue.
pub struct SecureCommandGate {
    registry: RwLock<HashMap<String, Arc<SecureCommand>>>,
    sensitive: SensitiveCommands,
    command_map: Arc<dyn CommandMap>,
    namespace: String,
    queue: UnboundedSender<PendingDispatch>,
    pending: Mutex<UnboundedReceiver<PendingDispatch>>,
}

impl SecureCommandGate {
    /// Creates a gate whose sensitive set starts from the configured baseline.
    pub fn new(command_map: Arc<dyn CommandMap>, config: &WhisperConfig) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();
        Self {
            registry: RwLock::new(HashMap::new()),
            sensitive: SensitiveCommands::new(&config.baseline_sensitive_commands),
            command_map,
            namespace: config.plugin_name.clone(),
            queue,
            pending: Mutex::new(pending),
        }
    }

    /// Registers `command` under its name and every alias.
    ///
    /// A name that is already taken is overwritten. The host only receives a
    /// completion stub; execution stays with the gate.
    pub fn register_secure_command(&self, command: SecureCommand) {
        let command = Arc::new(command);
        {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            for label in std::iter::once(&command.name).chain(&command.aliases) {
                let label = label.to_lowercase();
                if registry.insert(label.clone(), command.clone()).is_some() {
                    tracing::warn!(command = %label, "secure command registered twice, replacing the earlier one");
                }
                self.sensitive.insert(&label);
            }
        }

        self.command_map
            .register_stub(&self.namespace, command.stub());
        tracing::info!(
            command = %command.name,
            aliases = command.aliases.len(),
            "registered secure command"
        );
    }

    /// Whether `name` is a registered secure command or alias.
    pub fn is_secure_command(&self, name: &str) -> bool {
        self.command(name).is_some()
    }

    /// The secure command registered under `name`, ignoring case.
    pub fn command(&self, name: &str) -> Option<Arc<SecureCommand>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_lowercase())
            .cloned()
    }

    /// The live sensitive-name set shared with every installed filter.
    pub fn sensitive_commands(&self) -> SensitiveCommands {
        self.sensitive.clone()
    }

    /// Installs the sensitive-command filter on every sink.
    pub fn install_log_filters(&self, sinks: &[Arc<dyn LogSink>]) {
        install_log_filters(&self.sensitive, sinks);
    }

    /// Phase one for a command line typed by a user, e.g. `/msg bob hi`.
    pub fn intercept_player_command(&self, user: UserId, raw: &str) -> Interception {
        self.intercept(CommandSender::User(user), raw, Channel::Player)
    }

    /// Phase one for a command line from the console, e.g. `msg bob hi`.
    pub fn intercept_console_command(&self, raw: &str) -> Interception {
        self.intercept(CommandSender::Console, raw, Channel::Console)
    }

    fn intercept(&self, sender: CommandSender, raw: &str, channel: Channel) -> Interception {
        let shortest = match channel {
            Channel::Player => 2,
            Channel::Console => 1,
        };
        if raw.len() < shortest {
            return Interception::PassThrough;
        }

        let line = raw.strip_prefix('/').unwrap_or(raw);
        let (label, raw_args) = line.split_once(' ').unwrap_or((line, ""));
        let label = self.local_label(label).to_lowercase();

        let Some(command) = self.command(&label) else {
            return Interception::PassThrough;
        };

        let dispatch = PendingDispatch {
            command,
            sender,
            label,
            raw_args: raw_args.to_string(),
            channel,
        };
        if self.queue.send(dispatch).is_err() {
            tracing::error!("secure command queue is closed, dropping command");
        }
        Interception::Suppressed
    }

    // The host may dispatch a stub as `namespace:name`.
    fn local_label<'a>(&self, label: &'a str) -> &'a str {
        match label.split_once(':') {
            Some((namespace, _)) if namespace.eq_ignore_ascii_case(&self.namespace) => {
                unqualified(label)
            }
            _ => label,
        }
    }

    /// Phase two: runs every queued command in arrival order.
    ///
    /// Returns how many commands ran.
    pub fn run_pending(&self) -> usize {
        let mut batch = Vec::new();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            while let Ok(dispatch) = pending.try_recv() {
                batch.push(dispatch);
            }
        }

        for dispatch in &batch {
            let args = parse_arguments(&dispatch.raw_args);
            if !dispatch.command.execute(dispatch.sender, &dispatch.label, &args) {
                tracing::debug!(command = %dispatch.command.name, "secure command reported bad usage");
            }
            if dispatch.channel == Channel::Console {
                tracing::info!(channel = "console", "a secure command was executed");
            }
        }

        batch.len()
    }
}

/// Splits a command's argument text, keeping double-quoted runs together.
///
/// A quote toggles quoting and is not kept. Spaces separate arguments only
/// outside quotes, and empty arguments are dropped.
pub fn parse_arguments(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    args
}
