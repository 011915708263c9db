/// Runtime settings for the whisper engine and the secure command gate.
#[derive(Clone, Debug)]
pub struct WhisperConfig {
    /// Number of transcript lines shown by `/whisper history`.
    pub history_page_size: usize,
    /// Command names whose audit lines are always filtered from logs.
    pub baseline_sensitive_commands: Vec<String>,
    /// Send the usage primer when a user joins.
    pub send_welcome_on_join: bool,
    /// Hint at the private message syntax when a chat line mentions someone.
    pub mention_hints: bool,
    /// Namespace used when registering completion stubs with the host.
    pub plugin_name: String,
    /// Chat line that leaves whisper-locked mode.
    pub exit_keyword: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            history_page_size: 10,
            baseline_sensitive_commands: ["whisper", "w", "msg", "tell"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            send_welcome_on_join: true,
            mention_hints: true,
            plugin_name: "WhisperChain".to_string(),
            exit_keyword: ".exit".to_string(),
        }
    }
}
