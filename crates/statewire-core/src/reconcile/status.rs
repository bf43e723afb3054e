// ── Classification step ──
//
// An explicit ordered rule table, first match wins. Adding a status is
// a single table edit; the completeness test below asserts every
// reachable (sources × connected × locked) combination maps to a
// status, so `Unknown` only ever appears if the table regresses.

use serde::{Deserialize, Serialize};

/// Derived status of one merged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Declared and observed, session up.
    Connected,
    /// Declared and observed, session down: the requested connection
    /// could not be established.
    ConnectionFailed,
    /// Observed only and locked: connected outside the user's control.
    ConnectedBySystem,
    /// Observed only and locked, session down.
    DisconnectedBySystem,
    /// Observed only, unlocked, still connected: a disconnection was
    /// expected but did not happen.
    DisconnectionFailed,
    /// Observed only, unlocked, session down.
    Disconnected,
    /// Declared but not observed at all.
    Missing,
    /// No rule matched. Tracked as a data-quality signal; carries no
    /// actions.
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Connected => "connected",
            Status::ConnectionFailed => "connection_failed",
            Status::ConnectedBySystem => "connected_by_system",
            Status::DisconnectedBySystem => "disconnected_by_system",
            Status::DisconnectionFailed => "disconnection_failed",
            Status::Disconnected => "disconnected",
            Status::Missing => "missing",
            Status::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The facts classification runs on, extracted from one merged record.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct RecordView {
    pub in_config: bool,
    pub in_system: bool,
    pub connected: bool,
    pub locked: bool,
}

struct Rule {
    status: Status,
    applies: fn(RecordView) -> bool,
}

// Order matters: the first matching rule decides.
const RULES: &[Rule] = &[
    Rule {
        status: Status::Connected,
        applies: |v| v.in_config && v.in_system && v.connected,
    },
    Rule {
        status: Status::ConnectionFailed,
        applies: |v| v.in_config && v.in_system && !v.connected,
    },
    Rule {
        status: Status::ConnectedBySystem,
        applies: |v| !v.in_config && v.in_system && v.locked && v.connected,
    },
    Rule {
        status: Status::DisconnectedBySystem,
        applies: |v| !v.in_config && v.in_system && v.locked && !v.connected,
    },
    Rule {
        status: Status::DisconnectionFailed,
        applies: |v| !v.in_config && v.in_system && !v.locked && v.connected,
    },
    Rule {
        status: Status::Disconnected,
        applies: |v| !v.in_config && v.in_system && !v.locked && !v.connected,
    },
    Rule {
        status: Status::Missing,
        applies: |v| v.in_config && !v.in_system,
    },
];

pub(crate) fn classify(view: RecordView) -> Status {
    RULES
        .iter()
        .find(|rule| (rule.applies)(view))
        .map_or(Status::Unknown, |rule| rule.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_table_covers_every_reachable_combination() {
        // A record always comes from at least one source.
        let memberships = [(true, true), (true, false), (false, true)];
        for (in_config, in_system) in memberships {
            for connected in [false, true] {
                for locked in [false, true] {
                    let view = RecordView {
                        in_config,
                        in_system,
                        connected,
                        locked,
                    };
                    assert_ne!(
                        classify(view),
                        Status::Unknown,
                        "no rule for {view:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        // Declared + observed + connected is Connected even when
        // locked: the both-sources rules come first.
        let status = classify(RecordView {
            in_config: true,
            in_system: true,
            connected: true,
            locked: true,
        });
        assert_eq!(status, Status::Connected);
    }

    #[test]
    fn system_only_statuses_split_on_lock_and_reachability() {
        let cases = [
            (true, true, Status::ConnectedBySystem),
            (true, false, Status::DisconnectedBySystem),
            (false, true, Status::DisconnectionFailed),
            (false, false, Status::Disconnected),
        ];
        for (locked, connected, expected) in cases {
            let status = classify(RecordView {
                in_config: false,
                in_system: true,
                connected,
                locked,
            });
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn config_only_is_missing_never_connected() {
        for connected in [false, true] {
            for locked in [false, true] {
                let status = classify(RecordView {
                    in_config: true,
                    in_system: false,
                    connected,
                    locked,
                });
                assert_eq!(status, Status::Missing);
            }
        }
    }
}
