//! Keeps secure command invocations out of log output.
//!
//! Hosts usually write an audit line such as
//! `Alice issued server command: /msg bob hello` for every command. The
//! filters here drop such lines whenever the command is sensitive, both for
//! host-owned [`LogSink`]s and for `tracing` layers.

use crate::{LogPredicate, LogSink};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

#[allow(clippy::expect_used)]
static AUDIT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)issued\b.*?\bcommand:\s*/(\S+)").expect("audit line pattern is valid")
});

/// Lowercased command names and aliases whose audit lines must be dropped.
///
/// Cloning shares the underlying set, so names added after a filter was
/// installed are honored by that filter.
#[derive(Clone, Default)]
pub struct SensitiveCommands(Arc<RwLock<HashSet<String>>>);

impl SensitiveCommands {
    /// Creates a set seeded with `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = Self::default();
        for name in names {
            set.insert(name.as_ref());
        }
        set
    }

    /// Adds a name. Case is ignored.
    pub fn insert(&self, name: &str) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_lowercase());
    }

    /// Whether `name` is sensitive. Case is ignored.
    pub fn contains(&self, name: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&name.to_lowercase())
    }

    /// Whether `line` is an audit line for a sensitive command.
    pub fn matches_audit_line(&self, line: &str) -> bool {
        AUDIT_LINE
            .captures(line)
            .and_then(|captures| captures.get(1))
            .is_some_and(|command| self.contains(unqualified(command.as_str())))
    }

    /// A predicate accepting every line that is not a sensitive audit line.
    pub fn predicate(&self) -> LogPredicate {
        let sensitive = self.clone();
        Arc::new(move |line: &str| !sensitive.matches_audit_line(line))
    }
}

/// Drops a `namespace:` qualifier from a command label.
pub(crate) fn unqualified(label: &str) -> &str {
    label.rsplit_once(':').map_or(label, |(_, name)| name)
}

/// Puts the sensitive-command check in front of every sink's current filter.
///
/// A line is written only if both the new check and the previous filter
/// accept it.
pub fn install_log_filters(sensitive: &SensitiveCommands, sinks: &[Arc<dyn LogSink>]) {
    for sink in sinks {
        let secure = sensitive.predicate();
        let chained: LogPredicate = match sink.filter() {
            Some(existing) => Arc::new(move |line: &str| secure(line) && existing(line)),
            None => secure,
        };
        sink.set_filter(chained);
        tracing::debug!(sink = sink.name(), "installed secure command log filter");
    }
}

/// Per-layer `tracing` filter that drops sensitive audit events.
///
/// ```ignore
/// let layer = fmt::layer().with_filter(SecureLogFilter::new(gate.sensitive_commands()));
/// ```
#[derive(Clone)]
pub struct SecureLogFilter {
    sensitive: SensitiveCommands,
}

impl SecureLogFilter {
    /// Creates a filter sharing `sensitive`.
    pub fn new(sensitive: SensitiveCommands) -> Self {
        Self { sensitive }
    }
}

impl<S: Subscriber> Filter<S> for SecureLogFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        !visitor
            .0
            .is_some_and(|message| self.sensitive.matches_audit_line(&message))
    }
}

#[derive(Default)]
struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}
