use crate::UserId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct LedgerState {
    // user -> peers in the order they were first whispered with
    peers: HashMap<UserId, Vec<UserId>>,
    // unordered pair -> transcript lines
    transcripts: HashMap<(UserId, UserId), Vec<String>>,
}

/// Per-pair whisper transcripts and the set of peers each user has talked to.
///
/// Both only ever grow. A single transcript is kept per unordered pair, so
/// `history(a, b)` and `history(b, a)` always return the same lines.
#[derive(Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` to the transcript of `a` and `b` and links them as peers.
    pub fn record_exchange(&self, a: UserId, b: UserId, line: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state
            .transcripts
            .entry(pair_key(a, b))
            .or_default()
            .push(line.into());

        for (user, peer) in [(a, b), (b, a)] {
            let peers = state.peers.entry(user).or_default();
            if !peers.contains(&peer) {
                peers.push(peer);
            }
        }
    }

    /// Returns the transcript between `a` and `b`, oldest first.
    pub fn history(&self, a: UserId, b: UserId) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transcripts
            .get(&pair_key(a, b))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the last `limit` transcript lines between `a` and `b`.
    pub fn recent_history(&self, a: UserId, b: UserId, limit: usize) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.transcripts.get(&pair_key(a, b)) {
            Some(lines) => lines[lines.len().saturating_sub(limit)..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Returns everyone `user` has exchanged a whisper with, in first-contact order.
    pub fn active_peers(&self, user: UserId) -> Vec<UserId> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peers
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }
}
