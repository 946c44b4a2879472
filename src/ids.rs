use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed identifier for one inbound call, backed by ULID.
///
/// The correlation token chosen by the sender is opaque and may be empty or reused,
/// so logs use this id to tie together parsing, dispatch and reply delivery.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct CallId(pub ulid::Ulid);

impl CallId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(CallId(id))
    }
}
