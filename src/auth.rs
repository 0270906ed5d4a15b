use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identity that scopes the mutation queue. Queues belonging to different
/// users never mix; switching users swaps the whole queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct User {
    uid: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    pub fn unauthenticated() -> Self {
        Self { uid: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.uid.is_some()
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.uid {
            Some(uid) => write!(f, "{uid}"),
            None => write!(f, "(unauthenticated)"),
        }
    }
}
