use std::fmt;

/// Stable identifier of a connected participant, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u128);

impl UserId {
    /// Wraps a raw host identifier.
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Returns the raw host identifier.
    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl From<u128> for UserId {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
