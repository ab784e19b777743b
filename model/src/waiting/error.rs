use snafu::Snafu;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// The two ways a wait can fail. Both are terminal; nothing above the poll loop retries.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum Error {
    #[snafu(display(
        "Timed out after {:?} waiting for {}, last observed: {}{}",
        timeout,
        waiting_for,
        last_observed,
        last_fetch_error
            .as_ref()
            .map(|e| format!(", last fetch error: {}", e))
            .unwrap_or_default()
    ))]
    Timeout {
        waiting_for: String,
        timeout: Duration,
        /// The last snapshot that was successfully fetched. Empty if no fetch ever succeeded.
        last_observed: Snapshot,
        /// Set when the final poll ticks failed to fetch anything.
        last_fetch_error: Option<String>,
    },

    #[snafu(display(
        "Unexpected status while waiting for {}: {} (observed: {})",
        waiting_for,
        offending,
        observed
    ))]
    UnexpectedStatus {
        waiting_for: String,
        /// The members whose status triggered the abort.
        offending: Snapshot,
        observed: Snapshot,
    },
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_unexpected_status(&self) -> bool {
        matches!(self, Error::UnexpectedStatus { .. })
    }

    /// The statuses seen on the last successful poll.
    pub fn last_observed(&self) -> &Snapshot {
        match self {
            Error::Timeout { last_observed, .. } => last_observed,
            Error::UnexpectedStatus { observed, .. } => observed,
        }
    }
}

/// The `(member, status)` pairs seen on one poll tick, rendered as strings.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Snapshot(pub Vec<(String, String)>);

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn statuses(&self) -> Vec<&str> {
        self.0.iter().map(|(_, status)| status.as_str()).collect()
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "nothing");
        }
        let members: Vec<String> = self
            .0
            .iter()
            .map(|(name, status)| format!("{}={}", name, status))
            .collect();
        write!(f, "[{}]", members.join(", "))
    }
}
