use crate::{Error, KeyStore, LockToggle, UserId, WhisperConfig, WhisperRouter};
use regex::Regex;
use std::sync::{Arc, LazyLock};

#[allow(clippy::expect_used)]
static PRIVATE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z0-9_,]+)\s+(\S.*)$").expect("private message pattern is valid")
});

#[allow(clippy::expect_used)]
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_]+").expect("mention pattern is valid"));

const WELCOME: [&str; 2] = [
    "Welcome to WhisperChain! To send an encrypted message, use: @playername Your secret message",
    "You can message multiple players with: @player1,player2,player3 Your secret message",
];
const MENTION_HINT: &str =
    "Tip: To send a private encrypted message, use: @playername Your secret message";

/// What the host should do with a chat line after interception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The line was handled privately and must not reach public chat.
    Consumed,
    /// Broadcast the line unchanged.
    PassThrough,
    /// Broadcast the line unchanged; the sender was sent a syntax hint.
    PassThroughWithHint,
}

/// Decides, for every chat line, whether it is a whisper or public chat.
///
/// Each user is either in normal mode or whisper-locked. While locked, every
/// line goes to the user's reply target. In normal mode, lines shaped like
/// `@name[,name...] message` become whispers and everything else passes
/// through.
pub struct ChatIntercept {
    router: Arc<WhisperRouter>,
    keys: Arc<KeyStore>,
    config: Arc<WhisperConfig>,
}

impl ChatIntercept {
    /// Creates an intercept that routes through `router`.
    pub fn new(router: Arc<WhisperRouter>, keys: Arc<KeyStore>, config: Arc<WhisperConfig>) -> Self {
        Self {
            router,
            keys,
            config,
        }
    }

    /// Session start: prepares the user's key and state.
    pub fn on_join(&self, user: UserId) {
        if let Err(err) = self.keys.get_or_create_key(user) {
            tracing::error!(user = %user, error = %err, "user cannot receive whispers");
        }
        self.router.state().observe(user);

        if self.config.send_welcome_on_join {
            for line in WELCOME {
                self.router.host().send_message(user, line);
            }
        }
    }

    /// Session end: drops the lock flag and reply target. History is kept.
    pub fn on_leave(&self, user: UserId) {
        self.router.state().forget(user);
    }

    /// Classifies and, where needed, handles one chat line from `user`.
    pub fn on_chat(&self, user: UserId, line: &str) -> ChatOutcome {
        if self.router.state().is_locked(user) {
            self.route_locked(user, line);
            return ChatOutcome::Consumed;
        }

        if let Some(captures) = PRIVATE_MESSAGE.captures(line) {
            let names = captures.get(1).map_or("", |m| m.as_str());
            let message = captures.get(2).map_or("", |m| m.as_str());

            if let Err(err) = self.router.send_to_names(user, [names], message) {
                self.router.report(user, &err);
            }
            return ChatOutcome::Consumed;
        }

        if MENTION.is_match(line) && self.config.mention_hints {
            self.router.host().send_message(user, MENTION_HINT);
            return ChatOutcome::PassThroughWithHint;
        }

        ChatOutcome::PassThrough
    }

    fn route_locked(&self, user: UserId, line: &str) {
        let host = self.router.host();
        let state = self.router.state();

        if line.trim().eq_ignore_ascii_case(&self.config.exit_keyword) {
            state.set_locked(user, false);
            host.send_message(
                user,
                "Exited private chat mode. Your messages will now be sent to global chat.",
            );
            return;
        }

        match state.reply_target(user) {
            Some(target) if host.is_online(target) => {
                if let Err(err) = self.router.send(user, &[target], line) {
                    self.router.report(user, &err);
                }
            }
            Some(target) => {
                tracing::debug!(user = %user, target = %target, "reply target offline, leaving whisper mode");
                state.set_locked(user, false);
                host.send_message(
                    user,
                    "Your private chat partner is offline. Whisper mode disabled.",
                );
            }
            None => {
                state.set_locked(user, false);
                host.send_message(user, "No private chat partner set. Whisper mode disabled.");
            }
        }
    }

    /// Toggles whisper-lock using the current reply target.
    pub fn toggle_lock(&self, user: UserId) -> LockToggle {
        let host = self.router.host();
        let toggle = self.router.state().toggle_lock(user);

        match toggle {
            LockToggle::Locked(target) => host.send_message(
                user,
                &format!(
                    "Whisper mode enabled. All messages will be sent privately to {}.",
                    self.router.name_of(target)
                ),
            ),
            LockToggle::Unlocked => host.send_message(
                user,
                "Whisper mode disabled. Messages will be sent to public chat.",
            ),
            LockToggle::NoTarget => host.send_message(
                user,
                "No private chat partner set. Whisper someone first or use /whisper mode <player>.",
            ),
        }

        toggle
    }

    /// Locks onto the named user, or unlocks if already locked.
    pub fn lock_with(&self, user: UserId, target_name: &str) -> Result<LockToggle, Error> {
        let host = self.router.host();
        let state = self.router.state();

        if state.is_locked(user) {
            state.set_locked(user, false);
            host.send_message(
                user,
                "Exited private chat mode. Your messages will now be sent to global chat.",
            );
            return Ok(LockToggle::Unlocked);
        }

        let Some(target) = host.find_online(target_name) else {
            host.send_message(
                user,
                &format!("Player not found or offline: {target_name}"),
            );
            return Err(Error::UnknownUser(target_name.to_string()));
        };

        state.lock_with_target(user, target);
        host.send_message(
            user,
            &format!(
                "You are now in private chat mode with {}. All your messages will be encrypted and sent only to them.",
                self.router.name_of(target)
            ),
        );
        host.send_message(
            user,
            &format!(
                "Type {} to return to global chat.",
                self.config.exit_keyword
            ),
        );
        host.send_message(
            target,
            &format!(
                "{} has started a private encrypted chat session with you.",
                self.router.name_of(user)
            ),
        );

        Ok(LockToggle::Locked(target))
    }

    /// Whether the user is whisper-locked.
    pub fn is_whisper_locked(&self, user: UserId) -> bool {
        self.router.state().is_locked(user)
    }

    /// Sets the whisper-lock flag without any notice.
    pub fn set_whisper_locked(&self, user: UserId, locked: bool) {
        self.router.state().set_locked(user, locked);
    }

    /// The user's reply target.
    pub fn reply_target(&self, user: UserId) -> Option<UserId> {
        self.router.state().reply_target(user)
    }

    /// Sets the user's reply target.
    pub fn set_reply_target(&self, user: UserId, target: UserId) {
        self.router.state().set_reply_target(user, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatState, Ledger, MemoryHost};

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);
    const CAROL: UserId = UserId::new(3);

    fn setup(config: WhisperConfig) -> (Arc<MemoryHost>, ChatIntercept) {
        let host = Arc::new(MemoryHost::new());
        host.connect(ALICE, "Alice");
        host.connect(BOB, "Bob");
        host.connect(CAROL, "Carol");

        let keys = Arc::new(KeyStore::new());
        let router = Arc::new(WhisperRouter::new(
            host.clone(),
            keys.clone(),
            Arc::new(Ledger::new()),
            Arc::new(ChatState::new()),
        ));
        let intercept = ChatIntercept::new(router, keys, Arc::new(config));
        for user in [ALICE, BOB, CAROL] {
            intercept.on_join(user);
            host.take_messages(user);
        }
        (host, intercept)
    }

    #[test]
    fn test_join_sends_welcome_and_creates_key() {
        let host = Arc::new(MemoryHost::new());
        host.connect(ALICE, "Alice");
        let keys = Arc::new(KeyStore::new());
        let router = Arc::new(WhisperRouter::new(
            host.clone(),
            keys.clone(),
            Arc::new(Ledger::new()),
            Arc::new(ChatState::new()),
        ));
        let intercept = ChatIntercept::new(router, keys.clone(), Arc::new(WhisperConfig::default()));

        intercept.on_join(ALICE);

        assert!(keys.contains(ALICE));
        assert!(!intercept.is_whisper_locked(ALICE));
        assert_eq!(host.messages(ALICE), WELCOME.to_vec());
    }

    #[test]
    fn test_plain_chat_passes_through() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.on_chat(ALICE, "hello world"), ChatOutcome::PassThrough);
        assert!(host.messages(ALICE).is_empty());
    }

    #[test]
    fn test_private_message_is_consumed() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.on_chat(ALICE, "@bob hi there"), ChatOutcome::Consumed);
        assert_eq!(host.messages(BOB), vec!["[Whisper] From Alice: hi there"]);
        assert_eq!(intercept.reply_target(ALICE), Some(BOB));
    }

    #[test]
    fn test_group_message_leaves_reply_target_unset() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.on_chat(ALICE, "@Bob,carol plan"), ChatOutcome::Consumed);
        assert_eq!(host.messages(BOB).len(), 1);
        assert_eq!(host.messages(CAROL).len(), 1);
        assert_eq!(intercept.reply_target(ALICE), None);
    }

    #[test]
    fn test_unknown_recipients_are_reported() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.on_chat(ALICE, "@ghost boo"), ChatOutcome::Consumed);
        assert_eq!(host.messages(ALICE), vec!["No valid recipients found."]);
    }

    #[test]
    fn test_broken_mention_gets_hint() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.on_chat(ALICE, "hey @bob!"), ChatOutcome::PassThroughWithHint);
        assert_eq!(intercept.on_chat(ALICE, "@bob"), ChatOutcome::PassThroughWithHint);
        assert_eq!(host.messages(ALICE), vec![MENTION_HINT, MENTION_HINT]);
        assert!(host.messages(BOB).is_empty());
    }

    #[test]
    fn test_hints_can_be_disabled() {
        let config = WhisperConfig {
            mention_hints: false,
            ..WhisperConfig::default()
        };
        let (host, intercept) = setup(config);

        assert_eq!(intercept.on_chat(ALICE, "hey @bob!"), ChatOutcome::PassThrough);
        assert!(host.messages(ALICE).is_empty());
    }

    #[test]
    fn test_locked_chat_goes_to_target() {
        let (host, intercept) = setup(WhisperConfig::default());
        intercept.lock_with(ALICE, "bob").unwrap();
        host.take_messages(BOB);

        assert_eq!(intercept.on_chat(ALICE, "just between us"), ChatOutcome::Consumed);
        assert_eq!(host.messages(BOB), vec!["[Whisper] From Alice: just between us"]);
        assert!(host.messages(CAROL).is_empty());
    }

    #[test]
    fn test_locked_falls_back_when_target_leaves() {
        let (host, intercept) = setup(WhisperConfig::default());
        intercept.lock_with(ALICE, "bob").unwrap();
        host.take_messages(ALICE);
        host.take_messages(BOB);
        host.disconnect(BOB);

        assert_eq!(intercept.on_chat(ALICE, "still there?"), ChatOutcome::Consumed);
        assert!(!intercept.is_whisper_locked(ALICE));
        assert_eq!(
            host.messages(ALICE),
            vec!["Your private chat partner is offline. Whisper mode disabled."]
        );
        assert!(host.messages(BOB).is_empty());

        assert_eq!(intercept.on_chat(ALICE, "hello all"), ChatOutcome::PassThrough);
    }

    #[test]
    fn test_locked_without_target_unlocks() {
        let (host, intercept) = setup(WhisperConfig::default());
        intercept.set_whisper_locked(ALICE, true);

        assert_eq!(intercept.on_chat(ALICE, "anyone?"), ChatOutcome::Consumed);
        assert!(!intercept.is_whisper_locked(ALICE));
        assert_eq!(
            host.messages(ALICE),
            vec!["No private chat partner set. Whisper mode disabled."]
        );
    }

    #[test]
    fn test_exit_keyword_unlocks() {
        let (host, intercept) = setup(WhisperConfig::default());
        intercept.lock_with(ALICE, "bob").unwrap();
        host.take_messages(BOB);

        assert_eq!(intercept.on_chat(ALICE, " .EXIT "), ChatOutcome::Consumed);
        assert!(!intercept.is_whisper_locked(ALICE));
        assert!(host.messages(BOB).is_empty());
    }

    #[test]
    fn test_toggle_lock() {
        let (_, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.toggle_lock(ALICE), LockToggle::NoTarget);
        intercept.on_chat(ALICE, "@bob hi");
        assert_eq!(intercept.toggle_lock(ALICE), LockToggle::Locked(BOB));
        assert_eq!(intercept.toggle_lock(ALICE), LockToggle::Unlocked);
    }

    #[test]
    fn test_lock_with_unknown_user() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(
            intercept.lock_with(ALICE, "ghost").unwrap_err(),
            Error::UnknownUser("ghost".to_string())
        );
        assert!(!intercept.is_whisper_locked(ALICE));
        assert_eq!(host.messages(ALICE), vec!["Player not found or offline: ghost"]);
    }

    #[test]
    fn test_lock_with_notifies_target() {
        let (host, intercept) = setup(WhisperConfig::default());

        assert_eq!(intercept.lock_with(ALICE, "BOB").unwrap(), LockToggle::Locked(BOB));
        assert_eq!(
            host.messages(BOB),
            vec!["Alice has started a private encrypted chat session with you."]
        );
        assert_eq!(host.messages(ALICE)[1], "Type .exit to return to global chat.");
    }

    #[test]
    fn test_leave_clears_mode_but_not_history() {
        let (_, intercept) = setup(WhisperConfig::default());
        intercept.lock_with(ALICE, "bob").unwrap();
        intercept.on_chat(ALICE, "remember this");

        intercept.on_leave(ALICE);

        assert!(!intercept.is_whisper_locked(ALICE));
        assert_eq!(intercept.reply_target(ALICE), None);
        assert_eq!(
            intercept.router.history(ALICE, BOB),
            vec!["Alice: remember this"]
        );
    }
}
