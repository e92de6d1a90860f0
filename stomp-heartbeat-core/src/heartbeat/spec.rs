//! Heart-beat header parsing and negotiation

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the header carrying heart-beat settings
pub const HEART_BEAT_HEADER: &str = "heart-beat";

/// Header value meaning "no heart-beating wanted"
pub const HEART_BEAT_DISABLED: &str = "0,0";

/// Which peer declared a header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderSide {
    Client,
    Server,
}

impl fmt::Display for HeaderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderSide::Client => f.write_str("client"),
            HeaderSide::Server => f.write_str("server"),
        }
    }
}

/// Position of a value inside an `x,y` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderField {
    X,
    Y,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderField::X => f.write_str("x"),
            HeaderField::Y => f.write_str("y"),
        }
    }
}

/// A parsed `x,y` heart-beat header, both values in milliseconds
///
/// `x` is the smallest interval at which the declaring side can send,
/// `y` the interval at which it wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatHeader {
    pub x: u64,
    pub y: u64,
}

impl HeartbeatHeader {
    /// Parse a header value declared by `side`
    pub fn parse(side: HeaderSide, value: &str) -> Result<Self> {
        let fields: Vec<&str> = value.split(',').collect();
        if fields.len() != 2 {
            return Err(Error::HeaderFormat {
                side,
                value: value.to_string(),
            });
        }

        let parse_field = |field: HeaderField, raw: &str| {
            raw.parse::<u64>().map_err(|_| Error::HeaderField {
                side,
                field,
                value: raw.to_string(),
            })
        };

        Ok(Self {
            x: parse_field(HeaderField::X, fields[0])?,
            y: parse_field(HeaderField::Y, fields[1])?,
        })
    }
}

impl fmt::Display for HeartbeatHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// The agreed heart-beat behaviour for one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPlan {
    pub client: HeartbeatHeader,
    pub server: HeartbeatHeader,
    /// Interval between outgoing heart-beats, `None` when sending is off
    pub send_interval: Option<Duration>,
    /// Interval within which some frame must arrive, `None` when not checked
    pub receive_interval: Option<Duration>,
}

impl HeartbeatPlan {
    fn from_headers(client: HeartbeatHeader, server: HeartbeatHeader) -> Self {
        let send_interval = (client.x != 0 && server.y != 0)
            .then(|| Duration::from_millis(client.x.max(server.y)));
        let receive_interval = (server.x != 0 && client.y != 0)
            .then(|| Duration::from_millis(server.x.max(client.y)));

        Self {
            client,
            server,
            send_interval,
            receive_interval,
        }
    }

    pub fn send_enabled(&self) -> bool {
        self.send_interval.is_some()
    }

    pub fn receive_enabled(&self) -> bool {
        self.receive_interval.is_some()
    }
}

/// Outcome of heart-beat negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Negotiation {
    /// No monitoring in either direction
    Disabled,
    /// At least one direction is monitored
    Enabled(HeartbeatPlan),
}

impl Negotiation {
    pub fn plan(&self) -> Option<&HeartbeatPlan> {
        match self {
            Negotiation::Disabled => None,
            Negotiation::Enabled(plan) => Some(plan),
        }
    }
}

fn requested(value: Option<&str>) -> Option<&str> {
    value.filter(|v| *v != HEART_BEAT_DISABLED)
}

/// Reconcile the client- and server-declared heart-beat headers
///
/// A missing header or `"0,0"` on either side disables heart-beating without
/// error. Otherwise both values must be well-formed; the client header is
/// checked first.
pub fn negotiate(client: Option<&str>, server: Option<&str>) -> Result<Negotiation> {
    let (Some(client), Some(server)) = (requested(client), requested(server)) else {
        return Ok(Negotiation::Disabled);
    };

    let client = HeartbeatHeader::parse(HeaderSide::Client, client)?;
    let server = HeartbeatHeader::parse(HeaderSide::Server, server)?;

    let plan = HeartbeatPlan::from_headers(client, server);
    if !plan.send_enabled() && !plan.receive_enabled() {
        return Ok(Negotiation::Disabled);
    }

    Ok(Negotiation::Enabled(plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(client: &str, server: &str) -> HeartbeatPlan {
        match negotiate(Some(client), Some(server)).unwrap() {
            Negotiation::Enabled(plan) => plan,
            Negotiation::Disabled => panic!("expected heart-beating for {client} / {server}"),
        }
    }

    #[test]
    fn test_absent_or_zero_headers_disable() {
        let cases = [
            (None, None),
            (None, Some("1000,1000")),
            (Some("1000,1000"), None),
            (Some("0,0"), Some("5000,5000")),
            (Some("5000,5000"), Some("0,0")),
            (Some("0,0"), Some("0,0")),
        ];
        for (client, server) in cases {
            assert_eq!(
                negotiate(client, server).unwrap(),
                Negotiation::Disabled,
                "{client:?} / {server:?}"
            );
        }
    }

    #[test]
    fn test_zero_zero_disables_even_with_malformed_peer() {
        assert_eq!(
            negotiate(Some("0,0"), Some("garbage")).unwrap(),
            Negotiation::Disabled
        );
        assert_eq!(
            negotiate(Some("x,y,z"), None).unwrap(),
            Negotiation::Disabled
        );
    }

    #[test]
    fn test_receive_only_scenario() {
        let plan = plan("1000,2000", "3000,0");
        assert!(!plan.send_enabled());
        assert_eq!(plan.receive_interval, Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_send_only_scenario() {
        let plan = plan("4000,0", "0,2500");
        assert_eq!(plan.send_interval, Some(Duration::from_millis(4000)));
        assert!(!plan.receive_enabled());
    }

    #[test]
    fn test_both_directions_take_max() {
        let plan = plan("1000,5000", "2000,500");
        assert_eq!(plan.send_interval, Some(Duration::from_millis(1000)));
        assert_eq!(plan.receive_interval, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_enabled_flags_follow_their_own_inputs() {
        for cx in [0u64, 10] {
            for cy in [0u64, 20] {
                for sx in [0u64, 30] {
                    for sy in [0u64, 40] {
                        let client = format!("{cx},{cy}");
                        let server = format!("{sx},{sy}");
                        let outcome = negotiate(Some(&client), Some(&server)).unwrap();
                        let send = cx != 0 && sy != 0;
                        let receive = sx != 0 && cy != 0;
                        match outcome.plan() {
                            None => assert!(!send && !receive, "{client} / {server}"),
                            Some(plan) => {
                                assert_eq!(plan.send_enabled(), send, "{client} / {server}");
                                assert_eq!(plan.receive_enabled(), receive, "{client} / {server}");
                                if send {
                                    assert_eq!(
                                        plan.send_interval,
                                        Some(Duration::from_millis(cx.max(sy)))
                                    );
                                }
                                if receive {
                                    assert_eq!(
                                        plan.receive_interval,
                                        Some(Duration::from_millis(sx.max(cy)))
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_asymmetric_values_cancel_out() {
        assert_eq!(
            negotiate(Some("1000,0"), Some("1000,0")).unwrap(),
            Negotiation::Disabled
        );
    }

    #[test]
    fn test_non_numeric_client_x() {
        let err = negotiate(Some("abc,100"), Some("1000,1000")).unwrap_err();
        assert!(matches!(
            err,
            Error::HeaderField {
                side: HeaderSide::Client,
                field: HeaderField::X,
                ref value,
            } if value == "abc"
        ));
    }

    #[test]
    fn test_non_numeric_server_y() {
        let err = negotiate(Some("1000,1000"), Some("1000,-5")).unwrap_err();
        assert!(matches!(
            err,
            Error::HeaderField {
                side: HeaderSide::Server,
                field: HeaderField::Y,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_field_count() {
        for bad in ["1000", "1000,1000,1000", ""] {
            let err = negotiate(Some(bad), Some("1000,1000")).unwrap_err();
            assert!(
                matches!(err, Error::HeaderFormat { side: HeaderSide::Client, .. }),
                "{bad:?}"
            );
        }
        let err = negotiate(Some("1000,1000"), Some("1")).unwrap_err();
        assert!(matches!(err, Error::HeaderFormat { side: HeaderSide::Server, .. }));
    }

    #[test]
    fn test_whitespace_is_rejected() {
        let err = negotiate(Some("1000, 1000"), Some("1000,1000")).unwrap_err();
        assert!(err.is_negotiation());
    }

    #[test]
    fn test_negotiate_is_idempotent() {
        let first = negotiate(Some("1000,2000"), Some("3000,4000")).unwrap();
        let second = negotiate(Some("1000,2000"), Some("3000,4000")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_display_round_trips() {
        let header = HeartbeatHeader::parse(HeaderSide::Client, "250,750").unwrap();
        assert_eq!(header.to_string(), "250,750");
    }
}
