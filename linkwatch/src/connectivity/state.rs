//! Connectivity state machine.

use serde::{Deserialize, Serialize};

/// Result of feeding an observation into [`ConnectivityState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// No state change and no side effect required.
    Unchanged,
    /// First failure of an outage episode. An outage set must be queued.
    WentOffline,
    /// Reachability confirmed after an outage. Drain, then announce.
    Recovered,
}

/// Process-wide reachability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    online: bool,
    outage_reported: bool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            online: true,
            outage_reported: false,
        }
    }
}

impl ConnectivityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn outage_reported(&self) -> bool {
        self.outage_reported
    }

    /// Record a failed probe or a client disconnect.
    ///
    /// Only the first call of an outage episode yields [`Transition::WentOffline`].
    pub fn mark_offline(&mut self) -> Transition {
        self.online = false;
        if self.outage_reported {
            Transition::Unchanged
        } else {
            self.outage_reported = true;
            Transition::WentOffline
        }
    }

    /// Record a successful probe.
    ///
    /// The outage flag stays set until [`clear_outage`](Self::clear_outage)
    /// is called once the recovery side effects are done.
    pub fn mark_online(&mut self) -> Transition {
        if self.online {
            return Transition::Unchanged;
        }
        self.online = true;
        Transition::Recovered
    }

    /// End the outage episode.
    pub fn clear_outage(&mut self) {
        self.outage_reported = false;
    }
}
