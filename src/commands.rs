use crate::{
    ChatIntercept, CommandExecutor, CommandSender, Error, TabCompleter, UserId, WhisperConfig,
    WhisperRouter,
};
use std::sync::Arc;

const SUBCOMMANDS: [&str; 5] = ["help", "mode", "history", "reply", "group"];
const MESSAGE_FLAG: &str = "-m";

const HELP: [&str; 8] = [
    "/whisper <player> <message> - Send a private message",
    "/whisper <player1,player2> <message> - Send to multiple players",
    "/whisper <player1> <player2> -m <message> - Send to every player before -m",
    "/whisper group <player1,player2> <message> - Send to a group",
    "/whisper mode [player] - Toggle whisper mode (all messages go to your reply target)",
    "/whisper reply <message> - Reply to the last person you whispered",
    "/whisper history <player> - View chat history with a player",
    "/whisper help - Show this help message",
];

/// The `/whisper` command and its subcommands.
pub struct WhisperCommand {
    router: Arc<WhisperRouter>,
    intercept: Arc<ChatIntercept>,
    config: Arc<WhisperConfig>,
}

impl WhisperCommand {
    /// Creates the command over the engine's router and chat intercept.
    pub fn new(
        router: Arc<WhisperRouter>,
        intercept: Arc<ChatIntercept>,
        config: Arc<WhisperConfig>,
    ) -> Self {
        Self {
            router,
            intercept,
            config,
        }
    }

    fn tell(&self, user: UserId, line: &str) {
        self.router.host().send_message(user, line);
    }

    fn help(&self, user: UserId) {
        self.tell(user, &format!("====== {} Help ======", self.config.plugin_name));
        for line in HELP {
            self.tell(user, line);
        }
    }

    fn mode(&self, user: UserId, args: &[String]) {
        match args.get(1) {
            Some(target) => {
                if let Err(err) = self.intercept.lock_with(user, target) {
                    tracing::debug!(user = %user, error = %err, "could not enter whisper mode");
                }
            }
            None => {
                self.intercept.toggle_lock(user);
            }
        }
    }

    fn history(&self, user: UserId, name: &str) {
        let host = self.router.host();
        let Some(peer) = host.find_online(name) else {
            self.router.report(user, &Error::UnknownUser(name.to_string()));
            return;
        };

        let peer_name = self.router.name_of(peer);
        let lines = self
            .router
            .ledger()
            .recent_history(user, peer, self.config.history_page_size);
        if lines.is_empty() {
            self.tell(user, &format!("No chat history with {peer_name}"));
            return;
        }

        self.tell(user, &format!("====== Chat with {peer_name} ======"));
        for line in &lines {
            self.tell(user, line);
        }
    }

    /// `<names> <message...>` or `<names...> -m <message...>`.
    fn direct(&self, user: UserId, args: &[String]) -> bool {
        let (names, message) = match args.iter().position(|arg| arg == MESSAGE_FLAG) {
            Some(flag) => (&args[..flag], args[flag + 1..].join(" ")),
            None if args.len() < 2 => {
                self.tell(user, "Usage: /whisper <player> <message>");
                return false;
            }
            None => (&args[..1], args[1..].join(" ")),
        };

        let lists = names.iter().map(String::as_str);
        if let Err(err) = self.router.send_to_names(user, lists, &message) {
            self.router.report(user, &err);
        }
        true
    }

    fn online_names(&self) -> Vec<String> {
        let host = self.router.host();
        host.online_users()
            .into_iter()
            .filter_map(|user| host.display_name(user))
            .collect()
    }
}

impl CommandExecutor for WhisperCommand {
    fn execute(&self, sender: CommandSender, _label: &str, args: &[String]) -> bool {
        let CommandSender::User(user) = sender else {
            sender.reply(self.router.host(), "Only players can use this command.");
            return true;
        };

        let Some(subcommand) = args.first() else {
            self.help(user);
            return true;
        };

        match subcommand.to_lowercase().as_str() {
            "help" => self.help(user),
            "mode" => self.mode(user, args),
            "history" => match args.get(1) {
                Some(name) => self.history(user, name),
                None => {
                    self.tell(user, "Usage: /whisper history <player>");
                    return false;
                }
            },
            "reply" => {
                if args.len() < 2 {
                    self.tell(user, "Usage: /whisper reply <message>");
                    return false;
                }
                if let Err(err) = self.router.reply(user, &args[1..].join(" ")) {
                    self.router.report(user, &err);
                }
            }
            "group" => {
                if args.len() < 3 {
                    self.tell(user, "Usage: /whisper group <player1,player2,...> <message>");
                    return false;
                }
                let message = args[2..].join(" ");
                if let Err(err) = self.router.send_to_names(user, [args[1].as_str()], &message) {
                    self.router.report(user, &err);
                }
            }
            _ => return self.direct(user, args),
        }

        true
    }
}

impl TabCompleter for WhisperCommand {
    fn complete(&self, _sender: CommandSender, _alias: &str, args: &[String]) -> Vec<String> {
        let Some(partial) = args.last() else {
            return Vec::new();
        };

        let candidates: Vec<String> = match args {
            [_] => SUBCOMMANDS
                .iter()
                .map(|subcommand| subcommand.to_string())
                .chain(self.online_names())
                .collect(),
            [first, _] if first.eq_ignore_ascii_case("history") || first.eq_ignore_ascii_case("group") => {
                self.online_names()
            }
            [first, _] if first.eq_ignore_ascii_case("help") || first.eq_ignore_ascii_case("mode") => {
                Vec::new()
            }
            [_, _] => vec![MESSAGE_FLAG.to_string()],
            _ => Vec::new(),
        };

        let partial = partial.to_lowercase();
        candidates
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&partial))
            .collect()
    }
}
