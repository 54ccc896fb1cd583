//! Human-facing reference numbers for movements and counts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document reference number, e.g. `RCP-1713540000000-9f3a1c2b`.
///
/// Format is `{PREFIX}-{unix_millis}-{8 hex chars}`. The prefix identifies the
/// document kind (RCP/DEL/TRN/ADJ for movements, CNT for counts), the
/// timestamp gives operators a rough creation order, and the random suffix
/// keeps same-millisecond documents distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNo(String);

impl ReferenceNo {
    /// Generate a fresh reference number with the given document prefix.
    pub fn generate(prefix: &str) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let entropy = Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}-{millis}-{}", &entropy[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ReferenceNo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for ReferenceNo {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<ReferenceNo> for String {
    fn from(value: ReferenceNo) -> Self {
        value.0
    }
}
