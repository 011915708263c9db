#[cfg(test)]
mod integration_tests {
    use std::sync::{Arc, Mutex};
    use whisperchain::{
        ChatOutcome, CommandExecutor, CommandSender, Host, Interception, LogSink,
        MemoryCommandMap, MemoryHost, MemoryLogSink, SecureCommand, UserId, WhisperChain,
        WhisperConfig,
    };

    const ALICE: UserId = UserId::new(0xa);
    const BOB: UserId = UserId::new(0xb);
    const CAROL: UserId = UserId::new(0xc);

    /// A tiny chat server: writes an audit line for every command it handles
    /// itself and broadcasts chat that the engine lets through.
    struct Server {
        host: Arc<MemoryHost>,
        map: Arc<MemoryCommandMap>,
        server_log: Arc<MemoryLogSink>,
        sibling_log: Arc<MemoryLogSink>,
        public_chat: Mutex<Vec<String>>,
        chain: WhisperChain,
    }

    impl Server {
        fn start() -> Self {
            let host = Arc::new(MemoryHost::new());
            let map = Arc::new(MemoryCommandMap::new());
            let server_log = Arc::new(MemoryLogSink::new("server"));
            let sibling_log = Arc::new(MemoryLogSink::new("economy"));
            let sinks: Vec<Arc<dyn LogSink>> = vec![server_log.clone(), sibling_log.clone()];

            let chain = WhisperChain::enable(
                host.clone(),
                map.clone(),
                &sinks,
                WhisperConfig::default(),
            );

            let server = Self {
                host,
                map,
                server_log,
                sibling_log,
                public_chat: Mutex::new(Vec::new()),
                chain,
            };
            server.join(ALICE, "Alice");
            server.join(BOB, "Bob");
            server.join(CAROL, "Carol");
            server
        }

        fn join(&self, user: UserId, name: &str) {
            self.host.connect(user, name);
            self.chain.on_join(user);
            self.host.take_messages(user);
        }

        fn leave(&self, user: UserId) {
            self.chain.on_leave(user);
            self.host.disconnect(user);
        }

        fn chat(&self, user: UserId, line: &str) -> ChatOutcome {
            let outcome = self.chain.on_chat(user, line);
            if outcome != ChatOutcome::Consumed {
                let name = self.host.display_name(user).unwrap();
                self.public_chat.lock().unwrap().push(format!("<{name}> {line}"));
            }
            outcome
        }

        fn command(&self, user: UserId, raw: &str) -> Interception {
            let interception = self.chain.on_player_command(user, raw);
            if interception == Interception::PassThrough {
                let name = self.host.display_name(user).unwrap();
                self.server_log.log(&format!("{name} issued server command: {raw}"));
                self.sibling_log.log(&format!("[economy] {name} issued server command: {raw}"));
            }
            interception
        }

        fn public_chat(&self) -> Vec<String> {
            self.public_chat.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_group_whisper_flow() {
        let server = Server::start();

        println!("Step 1: Alice whispers Bob and Carol...");
        assert_eq!(server.chat(ALICE, "@Bob,carol secret plan"), ChatOutcome::Consumed);

        println!("Step 2: Both recipients see the plaintext...");
        for recipient in [BOB, CAROL] {
            let inbox = server.host.messages(recipient);
            assert_eq!(inbox.len(), 1);
            assert!(inbox[0].contains("secret plan"));
        }

        println!("Step 3: Alice gets one confirmation naming both...");
        let confirmations = server.host.messages(ALICE);
        assert_eq!(confirmations.len(), 1);
        assert!(confirmations[0].contains("Bob"));
        assert!(confirmations[0].contains("Carol"));

        println!("Step 4: Transcripts are recorded per pair...");
        for recipient in [BOB, CAROL] {
            assert_eq!(
                server.chain.history(ALICE, recipient).last().unwrap(),
                "Alice: secret plan"
            );
            assert_eq!(
                server.chain.history(ALICE, recipient),
                server.chain.history(recipient, ALICE)
            );
        }

        println!("Step 5: No reply target with two recipients...");
        assert_eq!(server.chain.reply_target(ALICE), None);
        assert!(server.public_chat().is_empty());
    }

    #[test]
    fn test_reply_through_secure_command() {
        let server = Server::start();

        server.chat(ALICE, "@B hi");
        assert!(server.host.messages(BOB).is_empty());
        assert!(server.host.messages(ALICE)[0].starts_with("No valid recipients"));

        server.host.take_messages(ALICE);
        server.chat(ALICE, "@Bob hi");
        assert_eq!(server.chain.reply_target(ALICE), Some(BOB));

        assert_eq!(
            server.command(ALICE, "/whisper reply there"),
            Interception::Suppressed
        );
        assert_eq!(server.host.messages(BOB).len(), 1);

        assert_eq!(server.chain.tick(), 1);
        assert_eq!(
            server.host.messages(BOB).last().unwrap(),
            "[Whisper] From Alice: there"
        );
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Vec<String>>>);

    impl CommandExecutor for Recorder {
        fn execute(&self, _sender: CommandSender, _label: &str, args: &[String]) -> bool {
            self.0.lock().unwrap().push(args.to_vec());
            true
        }
    }

    #[test]
    fn test_secure_command_never_reaches_logs() {
        let server = Server::start();
        let recorder = Arc::new(Recorder::default());
        server.chain.gate().register_secure_command(SecureCommand {
            name: "msg".to_string(),
            description: "Direct message".to_string(),
            usage: "/msg <player> <message>".to_string(),
            aliases: Vec::new(),
            executor: recorder.clone(),
            completer: None,
        });

        assert_eq!(server.command(BOB, "/msg bob hello"), Interception::Suppressed);
        assert_eq!(server.command(BOB, "/spawn"), Interception::PassThrough);
        server.chain.tick();

        assert_eq!(*recorder.0.lock().unwrap(), vec![vec!["bob", "hello"]]);
        for sink in [&server.server_log, &server.sibling_log] {
            let lines = sink.lines();
            assert!(lines.iter().all(|line| !line.contains("/msg ")));
            assert_eq!(lines.len(), 1);
            assert!(lines[0].ends_with("issued server command: /spawn"));
        }
    }

    #[test]
    fn test_audit_lines_for_aliases_are_filtered() {
        let server = Server::start();

        server.server_log.log("Alice issued server command: /TELL bob psst");
        server.server_log.log("Alice issued server command: /w bob psst");
        server.server_log.log("Alice issued server command: /whisper");

        assert!(server.server_log.lines().is_empty());
    }

    #[test]
    fn test_console_cannot_whisper() {
        let server = Server::start();

        assert_eq!(
            server.chain.on_console_command("whisper bob hi"),
            Interception::Suppressed
        );
        server.chain.tick();

        assert_eq!(server.host.console(), vec!["Only players can use this command."]);
        assert!(server.host.messages(BOB).is_empty());
    }

    #[test]
    fn test_whisper_mode_session() {
        let server = Server::start();

        println!("Step 1: Alice opens a private session with Carol...");
        server.command(ALICE, "/w mode carol");
        server.chain.tick();
        assert!(server.chain.is_whisper_locked(ALICE));
        assert_eq!(
            server.host.take_messages(CAROL),
            vec!["Alice has started a private encrypted chat session with you."]
        );

        println!("Step 2: Plain chat now goes only to Carol...");
        assert_eq!(server.chat(ALICE, "just us"), ChatOutcome::Consumed);
        assert_eq!(server.host.messages(CAROL), vec!["[Whisper] From Alice: just us"]);
        assert!(server.host.messages(BOB).is_empty());
        assert!(server.public_chat().is_empty());

        println!("Step 3: Carol leaves and Alice falls back to public chat...");
        server.leave(CAROL);
        server.host.take_messages(ALICE);
        assert_eq!(server.chat(ALICE, "hello?"), ChatOutcome::Consumed);
        assert!(!server.chain.is_whisper_locked(ALICE));
        assert_eq!(
            server.host.messages(ALICE),
            vec!["Your private chat partner is offline. Whisper mode disabled."]
        );

        assert_eq!(server.chat(ALICE, "hello all"), ChatOutcome::PassThrough);
        assert_eq!(server.public_chat(), vec!["<Alice> hello all"]);
    }

    #[test]
    fn test_history_survives_reconnect() {
        let server = Server::start();
        server.chat(ALICE, "@bob first");
        server.chain.set_whisper_locked(ALICE, true);

        server.leave(ALICE);
        server.join(ALICE, "Alice");

        assert!(!server.chain.is_whisper_locked(ALICE));
        assert_eq!(server.chain.reply_target(ALICE), None);
        assert_eq!(server.chain.history(BOB, ALICE), vec!["Alice: first"]);

        server.command(ALICE, "/whisper history bob");
        server.chain.tick();
        assert_eq!(
            server.host.messages(ALICE),
            vec!["====== Chat with Bob ======", "Alice: first"]
        );
    }

    #[test]
    fn test_tab_completion_through_stub() {
        let server = Server::start();
        let stub = server.map.stub("tell").unwrap();

        let args = vec!["history".to_string(), "b".to_string()];
        assert_eq!(
            stub.tab_complete(CommandSender::User(ALICE), "tell", &args),
            vec!["Bob"]
        );
    }

    #[test]
    fn test_mention_hint_passes_through() {
        let server = Server::start();

        assert_eq!(server.chat(BOB, "thanks @alice!"), ChatOutcome::PassThroughWithHint);
        assert_eq!(server.public_chat(), vec!["<Bob> thanks @alice!"]);
        assert_eq!(server.host.messages(BOB).len(), 1);
        assert!(server.host.messages(ALICE).is_empty());

        server.chain.send(ALICE, &[BOB], "direct").unwrap();
        assert_eq!(server.chain.reply_target(ALICE), Some(BOB));
        server.chain.set_reply_target(ALICE, CAROL);
        assert_eq!(server.chain.reply_target(ALICE), Some(CAROL));
    }
}
