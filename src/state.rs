use crate::UserId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Clone, Copy, Default)]
struct UserState {
    locked: bool,
    reply_target: Option<UserId>,
}

/// Outcome of [`ChatState::toggle_lock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockToggle {
    /// The user is now whisper-locked to this target.
    Locked(UserId),
    /// The user is back in normal chat.
    Unlocked,
    /// Locking was refused because no reply target is set.
    NoTarget,
}

/// Per-user whisper-lock flag and reply target.
///
/// Entries live from a user's join until their leave. Every method holds the
/// lock for its whole read-modify-write.
#[derive(Default)]
pub struct ChatState {
    users: RwLock<HashMap<UserId, UserState>>,
}

impl ChatState {
    /// Creates an empty state table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a user in normal mode. Existing state is kept.
    pub fn observe(&self, user: UserId) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user)
            .or_default();
    }

    /// Drops the user's lock flag and reply target.
    pub fn forget(&self, user: UserId) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
    }

    /// Whether the user is currently whisper-locked.
    pub fn is_locked(&self, user: UserId) -> bool {
        self.read(user).is_some_and(|state| state.locked)
    }

    /// Sets the whisper-lock flag directly.
    pub fn set_locked(&self, user: UserId, locked: bool) {
        self.write(user, |state| state.locked = locked);
    }

    /// The user's reply target, if any.
    pub fn reply_target(&self, user: UserId) -> Option<UserId> {
        self.read(user).and_then(|state| state.reply_target)
    }

    /// Sets the user's reply target.
    pub fn set_reply_target(&self, user: UserId, target: UserId) {
        self.write(user, |state| state.reply_target = Some(target));
    }

    /// Sets the reply target and locks in one step.
    pub fn lock_with_target(&self, user: UserId, target: UserId) {
        self.write(user, |state| {
            state.reply_target = Some(target);
            state.locked = true;
        });
    }

    /// Flips the lock. Locking requires an existing reply target.
    pub fn toggle_lock(&self, user: UserId) -> LockToggle {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let state = users.entry(user).or_default();

        if state.locked {
            state.locked = false;
            return LockToggle::Unlocked;
        }

        match state.reply_target {
            Some(target) => {
                state.locked = true;
                LockToggle::Locked(target)
            }
            None => LockToggle::NoTarget,
        }
    }

    fn read(&self, user: UserId) -> Option<UserState> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .copied()
    }

    fn write(&self, user: UserId, update: impl FnOnce(&mut UserState)) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        update(users.entry(user).or_default());
    }
}
