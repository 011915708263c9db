/// Errors that can occur while routing whispers or handling secure commands.
///
/// The `Display` text of the user-facing variants is the exact chat line
/// shown to the user who caused them.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// None of the requested recipients resolved to an online user.
    #[error("No valid recipients found.")]
    NoRecipients,

    /// The whisper body was empty.
    #[error("Please provide a message to send.")]
    EmptyMessage,

    /// A reply was requested but no reply target is set.
    #[error("No one to reply to.")]
    NoReplyTarget,

    /// The reply target is no longer online.
    #[error("The player you were talking to is no longer online.")]
    UnreachableReplyTarget,

    /// A name did not resolve to an online user.
    #[error("Player not found: {0}")]
    UnknownUser(String),

    /// Ciphertext was malformed or sealed under a different key.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The OS random source could not produce key material.
    #[error("Secure messaging is unavailable: key generation failed")]
    KeyGeneration,

    /// A cryptographic operation other than decryption failed.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

impl Error {
    /// Whether this error is caused by user input and can be shown as a chat line.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NoRecipients
                | Self::EmptyMessage
                | Self::NoReplyTarget
                | Self::UnreachableReplyTarget
                | Self::UnknownUser(_)
        )
    }
}

impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Decryption(value.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(value: base64::DecodeError) -> Self {
        Self::Decryption(value.to_string())
    }
}
