use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::timestamp::Timestamp;

/// Server-assigned version of a document or snapshot. Versions are totally
/// ordered; purely local state carries [`SnapshotVersion::MIN`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SnapshotVersion(Timestamp);

impl SnapshotVersion {
    /// Version of documents the server has never confirmed. Displays as `0`.
    pub const MIN: SnapshotVersion = SnapshotVersion(Timestamp {
        seconds: 0,
        nanos: 0,
    });

    pub fn new(timestamp: Timestamp) -> Self {
        Self(timestamp)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.0
    }
}

impl Display for SnapshotVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.0.seconds, self.0.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_sorts_before_everything() {
        let v1 = SnapshotVersion::new(Timestamp::new(0, 1));
        assert!(SnapshotVersion::MIN < v1);
        assert_eq!(SnapshotVersion::MIN, SnapshotVersion::new(Timestamp::new(0, 0)));
    }
}
