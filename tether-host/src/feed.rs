//! Line-oriented record feed read from stdin.
//!
//! ```text
//! location <lat> <lon>
//! history <free text>
//! ```

use tether_core::ChannelClient;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedLine {
    Location { latitude: f64, longitude: f64 },
    History(String),
    Blank,
}

/// Why a feed line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("usage: location <lat> <lon>")]
    LocationUsage,

    #[error("usage: history <text>")]
    HistoryUsage,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{value} is outside ±{limit}")]
    OutOfRange { value: f64, limit: f64 },

    #[error("unknown record kind '{0}'")]
    UnknownKind(String),
}

impl FeedLine {
    pub fn parse(line: &str) -> Result<Self, FeedError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Self::Blank);
        }
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match verb {
            "location" => {
                let mut parts = rest.split_whitespace();
                let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(FeedError::LocationUsage);
                };
                let latitude = parse_coordinate(lat, 90.0)?;
                let longitude = parse_coordinate(lon, 180.0)?;
                Ok(Self::Location {
                    latitude,
                    longitude,
                })
            }
            "history" if !rest.is_empty() => Ok(Self::History(rest.to_string())),
            "history" => Err(FeedError::HistoryUsage),
            other => Err(FeedError::UnknownKind(other.to_string())),
        }
    }

    /// Hand the record to the client. Returns `false` for blank lines.
    pub fn apply(self, client: &ChannelClient) -> bool {
        match self {
            Self::Location {
                latitude,
                longitude,
            } => client.enqueue_location(latitude, longitude),
            Self::History(entry) => client.enqueue_history_entry(entry),
            Self::Blank => return false,
        }
        true
    }
}

fn parse_coordinate(text: &str, limit: f64) -> Result<f64, FeedError> {
    let value: f64 = text
        .parse()
        .map_err(|_| FeedError::NotANumber(text.to_string()))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(FeedError::OutOfRange { value, limit });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_location() {
        assert_eq!(
            FeedLine::parse("location 52.52 13.405").unwrap(),
            FeedLine::Location {
                latitude: 52.52,
                longitude: 13.405
            }
        );
        assert_eq!(
            FeedLine::parse("  location   -33.9\t151.2 ").unwrap(),
            FeedLine::Location {
                latitude: -33.9,
                longitude: 151.2
            }
        );
    }

    #[test]
    fn history_keeps_inner_spacing() {
        assert_eq!(
            FeedLine::parse("history rust  websocket client").unwrap(),
            FeedLine::History("rust  websocket client".into())
        );
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(FeedLine::parse("").unwrap(), FeedLine::Blank);
        assert_eq!(FeedLine::parse("   ").unwrap(), FeedLine::Blank);
        assert_eq!(FeedLine::parse("# note").unwrap(), FeedLine::Blank);
    }

    #[test]
    fn rejects_bad_lines() {
        let cases = [
            ("location", FeedError::LocationUsage),
            ("location 1", FeedError::LocationUsage),
            ("location 1 2 3", FeedError::LocationUsage),
            ("location north 2", FeedError::NotANumber("north".into())),
            (
                "location 91 0",
                FeedError::OutOfRange {
                    value: 91.0,
                    limit: 90.0,
                },
            ),
            (
                "location 0 -181",
                FeedError::OutOfRange {
                    value: -181.0,
                    limit: 180.0,
                },
            ),
            ("history", FeedError::HistoryUsage),
            ("history   ", FeedError::HistoryUsage),
            ("screenshot now", FeedError::UnknownKind("screenshot".into())),
        ];
        for (line, expected) in cases {
            assert_eq!(FeedLine::parse(line), Err(expected), "{line}");
        }
    }

    #[test]
    fn non_finite_coordinates_are_out_of_range() {
        for line in ["location NaN 0", "location 0 inf"] {
            assert!(
                matches!(FeedLine::parse(line), Err(FeedError::OutOfRange { .. })),
                "{line}"
            );
        }
    }

    #[test]
    fn error_messages_name_the_problem() {
        assert_eq!(
            FeedError::NotANumber("north".into()).to_string(),
            "'north' is not a number"
        );
        assert_eq!(
            FeedError::UnknownKind("screenshot".into()).to_string(),
            "unknown record kind 'screenshot'"
        );
    }
}
