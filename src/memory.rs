//! In-memory host implementations.
//!
//! Useful for tests and for embedding the engine in a process that has no
//! real chat server behind it.

use crate::{CommandMap, CommandStub, Host, LogPredicate, LogSink, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MemoryHostState {
    online: HashMap<UserId, String>,
    inboxes: HashMap<UserId, Vec<String>>,
    console: Vec<String>,
}

/// A [`Host`] that keeps presence and delivered lines in memory.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryHostState>,
}

impl MemoryHost {
    /// Creates a host with nobody online.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user as online under `name`.
    pub fn connect(&self, user: UserId, name: impl Into<String>) {
        self.lock().online.insert(user, name.into());
    }

    /// Marks a user as offline. Their inbox is kept.
    pub fn disconnect(&self, user: UserId) {
        self.lock().online.remove(&user);
    }

    /// Every line delivered to the user so far.
    pub fn messages(&self, user: UserId) -> Vec<String> {
        self.lock().inboxes.get(&user).cloned().unwrap_or_default()
    }

    /// Removes and returns the lines delivered to the user so far.
    pub fn take_messages(&self, user: UserId) -> Vec<String> {
        self.lock().inboxes.remove(&user).unwrap_or_default()
    }

    /// Every line delivered to the console so far.
    pub fn console(&self) -> Vec<String> {
        self.lock().console.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryHostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Host for MemoryHost {
    fn find_online(&self, name: &str) -> Option<UserId> {
        self.lock()
            .online
            .iter()
            .find(|(_, online_name)| online_name.eq_ignore_ascii_case(name))
            .map(|(user, _)| *user)
    }

    fn display_name(&self, user: UserId) -> Option<String> {
        self.lock().online.get(&user).cloned()
    }

    fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<_> = self.lock().online.keys().copied().collect();
        users.sort();
        users
    }

    fn send_message(&self, user: UserId, line: &str) {
        self.lock()
            .inboxes
            .entry(user)
            .or_default()
            .push(line.to_string());
    }

    fn send_console(&self, line: &str) {
        self.lock().console.push(line.to_string());
    }
}

/// A [`CommandMap`] that records registered stubs.
#[derive(Default)]
pub struct MemoryCommandMap {
    stubs: Mutex<Vec<(String, CommandStub)>>,
}

impl MemoryCommandMap {
    /// Creates an empty command map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a stub by name or alias, ignoring case.
    pub fn stub(&self, label: &str) -> Option<CommandStub> {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(_, stub)| {
                stub.name.eq_ignore_ascii_case(label)
                    || stub.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(label))
            })
            .map(|(_, stub)| stub.clone())
    }

    /// Namespaces and names of all registered stubs, in registration order.
    pub fn registered(&self) -> Vec<(String, String)> {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(namespace, stub)| (namespace.clone(), stub.name.clone()))
            .collect()
    }
}

impl CommandMap for MemoryCommandMap {
    fn register_stub(&self, namespace: &str, stub: CommandStub) {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((namespace.to_string(), stub));
    }
}

/// A [`LogSink`] that stores the lines its filter lets through.
pub struct MemoryLogSink {
    name: String,
    filter: Mutex<Option<LogPredicate>>,
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    /// Creates a sink with no filter installed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: Mutex::new(None),
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Writes a line unless the installed filter rejects it.
    pub fn log(&self, line: &str) {
        let filter = self
            .filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if filter.is_none_or(|accept| accept(line)) {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line.to_string());
        }
    }

    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemoryLogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> Option<LogPredicate> {
        self.filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_filter(&self, filter: LogPredicate) {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = Some(filter);
    }
}
