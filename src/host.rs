//! Contracts the hosting chat server provides to the whisper engine.
//!
//! The engine never talks to players, consoles or loggers directly; the host
//! implements these traits and feeds events in through
//! [`ChatIntercept`](crate::ChatIntercept) and
//! [`SecureCommandGate`](crate::SecureCommandGate).

use crate::UserId;
use std::sync::Arc;

/// Presence directory and per-user message delivery.
pub trait Host: Send + Sync {
    /// Resolves a display name (case-insensitive) to an online user.
    fn find_online(&self, name: &str) -> Option<UserId>;

    /// Display name of an online user, `None` once they have left.
    fn display_name(&self, user: UserId) -> Option<String>;

    /// Whether the user is currently reachable.
    fn is_online(&self, user: UserId) -> bool {
        self.display_name(user).is_some()
    }

    /// All currently reachable users.
    fn online_users(&self) -> Vec<UserId>;

    /// Delivers one line of text to the user's screen.
    fn send_message(&self, user: UserId, line: &str);

    /// Delivers one line of text to the server console.
    fn send_console(&self, line: &str);
}

/// Who invoked a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandSender {
    /// An interactive user.
    User(UserId),
    /// The administrative console.
    Console,
}

impl CommandSender {
    /// Sends a reply line to whoever invoked the command.
    pub fn reply(&self, host: &dyn Host, line: &str) {
        match self {
            Self::User(user) => host.send_message(*user, line),
            Self::Console => host.send_console(line),
        }
    }
}

/// Something that can run a command.
pub trait CommandExecutor: Send + Sync {
    /// Runs the command invoked as `label` with already-split arguments.
    ///
    /// Returns `false` when the input was not understood.
    fn execute(&self, sender: CommandSender, label: &str, args: &[String]) -> bool;
}

/// Something that can suggest completions for a partially typed command.
pub trait TabCompleter: Send + Sync {
    /// Suggestions for the last element of `args`.
    fn complete(&self, sender: CommandSender, alias: &str, args: &[String]) -> Vec<String>;
}

/// Completion-only command registered with the host's own dispatcher.
///
/// Execution never happens through the stub; secure commands run only via
/// the gate's deferred dispatch.
#[derive(Clone)]
pub struct CommandStub {
    /// Primary command name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Usage text.
    pub usage: String,
    /// Alternative names.
    pub aliases: Vec<String>,
    pub(crate) completer: Option<Arc<dyn TabCompleter>>,
}

impl CommandStub {
    /// Always succeeds without doing anything.
    pub fn execute(&self, _sender: CommandSender, _label: &str, _args: &[String]) -> bool {
        true
    }

    /// Forwards to the secure command's completer, if it has one.
    pub fn tab_complete(&self, sender: CommandSender, alias: &str, args: &[String]) -> Vec<String> {
        match &self.completer {
            Some(completer) => completer.complete(sender, alias, args),
            None => Vec::new(),
        }
    }
}

/// The host's command dispatcher.
pub trait CommandMap: Send + Sync {
    /// Registers a completion stub under `namespace`.
    fn register_stub(&self, namespace: &str, stub: CommandStub);
}

/// Predicate deciding whether a log line may be written.
pub type LogPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A logger owned by the host or by another component loaded in it.
pub trait LogSink: Send + Sync {
    /// Name of the component owning this logger.
    fn name(&self) -> &str;

    /// The currently installed filter, if any.
    fn filter(&self) -> Option<LogPredicate>;

    /// Replaces the installed filter.
    fn set_filter(&self, filter: LogPredicate);
}
