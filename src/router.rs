use crate::{ChatState, Error, Host, KeyStore, Ledger, UserId, encrypt};
use std::sync::Arc;

/// Prefix on every whisper notice.
pub const WHISPER_TAG: &str = "[Whisper]";

/// What a successful [`WhisperRouter::send`] produced.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Recipients in the order they were addressed, duplicates removed.
    pub recipients: Vec<UserId>,
    /// The message sealed under each recipient's key. Safe to persist or log.
    pub sealed: Vec<(UserId, String)>,
}

/// Entry point for sending a whisper to one or more users.
///
/// The router seals the message under each recipient's key, records the
/// plaintext transcript in the [`Ledger`], delivers the notices and keeps the
/// sender's reply target current. It does not check presence: callers pass
/// only users that are reachable.
pub struct WhisperRouter {
    host: Arc<dyn Host>,
    keys: Arc<KeyStore>,
    ledger: Arc<Ledger>,
    state: Arc<ChatState>,
}

impl WhisperRouter {
    /// Creates a router over shared engine state.
    pub fn new(
        host: Arc<dyn Host>,
        keys: Arc<KeyStore>,
        ledger: Arc<Ledger>,
        state: Arc<ChatState>,
    ) -> Self {
        Self {
            host,
            keys,
            ledger,
            state,
        }
    }

    /// Resolves comma-separated name lists to online users.
    ///
    /// Matching is case-insensitive. Unknown or offline names are skipped and
    /// repeated names collapse to a single recipient.
    pub fn resolve_recipients<'a>(&self, lists: impl IntoIterator<Item = &'a str>) -> Vec<UserId> {
        let mut recipients = Vec::new();
        for name in lists
            .into_iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            if let Some(user) = self.host.find_online(name) {
                if !recipients.contains(&user) {
                    recipients.push(user);
                }
            }
        }
        recipients
    }

    /// Sends `message` from `sender` to every user in `recipients`.
    ///
    /// All recipients' keys are fetched and the message sealed before anything
    /// is delivered, so a key failure leaves no partial delivery behind.
    pub fn send(
        &self,
        sender: UserId,
        recipients: &[UserId],
        message: &str,
    ) -> Result<Delivery, Error> {
        let mut unique = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if !unique.contains(recipient) {
                unique.push(*recipient);
            }
        }

        if unique.is_empty() {
            return Err(Error::NoRecipients);
        }
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let sealed = unique
            .iter()
            .map(|recipient| {
                let key = self.keys.get_or_create_key(*recipient)?;
                Ok((*recipient, encrypt(message, &key)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let sender_name = self.name_of(sender);
        let transcript_line = format!("{sender_name}: {message}");

        for (recipient, ciphertext) in &sealed {
            self.ledger
                .record_exchange(sender, *recipient, transcript_line.as_str());
            self.host.send_message(
                *recipient,
                &format!("{WHISPER_TAG} From {sender_name}: {message}"),
            );
            tracing::debug!(from = %sender, to = %recipient, ciphertext = %ciphertext, "whisper delivered");
        }

        let names = unique
            .iter()
            .map(|recipient| self.name_of(*recipient))
            .collect::<Vec<_>>()
            .join(", ");
        self.host
            .send_message(sender, &format!("{WHISPER_TAG} To {names}: {message}"));

        if let [only] = unique.as_slice() {
            self.state.set_reply_target(sender, *only);
        }

        Ok(Delivery {
            recipients: unique,
            sealed,
        })
    }

    /// Resolves name lists and sends to whoever is online.
    pub fn send_to_names<'a>(
        &self,
        sender: UserId,
        lists: impl IntoIterator<Item = &'a str>,
        message: &str,
    ) -> Result<Delivery, Error> {
        let recipients = self.resolve_recipients(lists);
        self.send(sender, &recipients, message)
    }

    /// Sends `message` to the sender's reply target.
    pub fn reply(&self, sender: UserId, message: &str) -> Result<Delivery, Error> {
        let target = self
            .state
            .reply_target(sender)
            .ok_or(Error::NoReplyTarget)?;
        if !self.host.is_online(target) {
            return Err(Error::UnreachableReplyTarget);
        }
        self.send(sender, &[target], message)
    }

    /// The transcript between two users, oldest first.
    pub fn history(&self, a: UserId, b: UserId) -> Vec<String> {
        self.ledger.history(a, b)
    }

    /// Peers of `user` that are currently online, in first-contact order.
    pub fn online_peers(&self, user: UserId) -> Vec<UserId> {
        self.ledger
            .active_peers(user)
            .into_iter()
            .filter(|peer| self.host.is_online(*peer))
            .collect()
    }

    /// Tells `user` why their whisper failed.
    ///
    /// Failures that are not the user's fault are logged as errors too.
    pub fn report(&self, user: UserId, err: &Error) {
        if !err.is_user_facing() {
            tracing::error!(user = %user, error = %err, "whisper failed");
        }
        self.host.send_message(user, &err.to_string());
    }

    pub(crate) fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn state(&self) -> &ChatState {
        &self.state
    }

    pub(crate) fn name_of(&self, user: UserId) -> String {
        self.host
            .display_name(user)
            .unwrap_or_else(|| user.to_string())
    }
}
