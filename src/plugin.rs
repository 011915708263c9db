use crate::{
    ChatIntercept, ChatOutcome, ChatState, CommandMap, Delivery, Error, Host, Interception,
    KeyStore, Ledger, LogSink, SecureCommand, SecureCommandGate, UserId, WhisperCommand,
    WhisperConfig, WhisperRouter,
};
use std::sync::Arc;

const WHISPER_ALIASES: [&str; 3] = ["w", "msg", "tell"];

/// The whole whisper engine, wired together for one host.
///
/// Built by [`WhisperChain::enable`] when the host starts and torn down with
/// [`WhisperChain::disable`]. The host forwards its events to the `on_*`
/// methods and calls [`WhisperChain::tick`] once per main-loop iteration.
pub struct WhisperChain {
    keys: Arc<KeyStore>,
    router: Arc<WhisperRouter>,
    intercept: Arc<ChatIntercept>,
    gate: SecureCommandGate,
}

impl WhisperChain {
    /// Builds every component, installs the log filters on `log_sinks` and
    /// registers `/whisper` with its aliases as a secure command.
    pub fn enable(
        host: Arc<dyn Host>,
        command_map: Arc<dyn CommandMap>,
        log_sinks: &[Arc<dyn LogSink>],
        config: WhisperConfig,
    ) -> Self {
        let config = Arc::new(config);
        let keys = Arc::new(KeyStore::new());
        let router = Arc::new(WhisperRouter::new(
            host,
            keys.clone(),
            Arc::new(Ledger::new()),
            Arc::new(ChatState::new()),
        ));
        let intercept = Arc::new(ChatIntercept::new(
            router.clone(),
            keys.clone(),
            config.clone(),
        ));

        let gate = SecureCommandGate::new(command_map, &config);
        gate.install_log_filters(log_sinks);

        let whisper = Arc::new(WhisperCommand::new(
            router.clone(),
            intercept.clone(),
            config.clone(),
        ));
        gate.register_secure_command(SecureCommand {
            name: "whisper".to_string(),
            description: "Send encrypted private messages".to_string(),
            usage: "/whisper <player> <message>".to_string(),
            aliases: WHISPER_ALIASES.iter().map(|alias| alias.to_string()).collect(),
            executor: whisper.clone(),
            completer: Some(whisper),
        });

        tracing::info!(name = %config.plugin_name, sinks = log_sinks.len(), "whisper engine enabled");

        Self {
            keys,
            router,
            intercept,
            gate,
        }
    }

    /// Stops the engine. Commands still queued run first, then keys and
    /// transcripts are dropped.
    pub fn disable(self) {
        let flushed = self.gate.run_pending();
        tracing::info!(keys = self.keys.len(), flushed, "whisper engine disabled");
    }

    /// Session start. Creates the user's key and sends the welcome.
    pub fn on_join(&self, user: UserId) {
        self.intercept.on_join(user);
    }

    /// Session end. Transcripts are kept.
    pub fn on_leave(&self, user: UserId) {
        self.intercept.on_leave(user);
    }

    /// See [`ChatIntercept::on_chat`].
    pub fn on_chat(&self, user: UserId, line: &str) -> ChatOutcome {
        self.intercept.on_chat(user, line)
    }

    /// See [`SecureCommandGate::intercept_player_command`].
    pub fn on_player_command(&self, user: UserId, raw: &str) -> Interception {
        self.gate.intercept_player_command(user, raw)
    }

    /// See [`SecureCommandGate::intercept_console_command`].
    pub fn on_console_command(&self, raw: &str) -> Interception {
        self.gate.intercept_console_command(raw)
    }

    /// Runs the secure commands intercepted since the previous tick.
    pub fn tick(&self) -> usize {
        self.gate.run_pending()
    }

    /// See [`WhisperRouter::send`].
    pub fn send(&self, sender: UserId, recipients: &[UserId], message: &str) -> Result<Delivery, Error> {
        self.router.send(sender, recipients, message)
    }

    /// The transcript between two users, oldest first.
    pub fn history(&self, a: UserId, b: UserId) -> Vec<String> {
        self.router.history(a, b)
    }

    /// Whether the user's chat currently goes to their reply target.
    pub fn is_whisper_locked(&self, user: UserId) -> bool {
        self.intercept.is_whisper_locked(user)
    }

    /// Sets the whisper-lock flag without notifying the user.
    pub fn set_whisper_locked(&self, user: UserId, locked: bool) {
        self.intercept.set_whisper_locked(user, locked);
    }

    /// The peer the user's replies go to.
    pub fn reply_target(&self, user: UserId) -> Option<UserId> {
        self.intercept.reply_target(user)
    }

    /// Points the user's replies at `target`.
    pub fn set_reply_target(&self, user: UserId, target: UserId) {
        self.intercept.set_reply_target(user, target);
    }

    /// The secure command gate, for registering further commands.
    pub fn gate(&self) -> &SecureCommandGate {
        &self.gate
    }

    /// The engine's key store.
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}
