//! Subject naming and wildcard filters for published events.
//!
//! Subjects are dot-separated tokens. Filters may use `*` to match exactly
//! one token and a trailing `>` to match one or more remaining tokens.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Root token of every game subject.
pub const SUBJECT_ROOT: &str = "game";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("subject or filter is empty")]
    Empty,

    #[error("empty token in {0:?}")]
    EmptyToken(String),

    #[error("'>' must be the last token in {0:?}")]
    MisplacedTail(String),

    #[error("invalid event type {0:?}: expected a single token without wildcards")]
    InvalidEventType(String),
}

/// Builds the subject an event type is published on.
pub fn subject_for(event_type: &str) -> String {
    format!("{SUBJECT_ROOT}.{event_type}")
}

/// Checks that an event type can be used as a single subject token.
pub fn validate_event_type(event_type: &str) -> Result<(), SubjectError> {
    let valid = !event_type.is_empty()
        && !event_type
            .chars()
            .any(|c| matches!(c, '.' | '*' | '>') || c.is_whitespace());
    if valid {
        Ok(())
    } else {
        Err(SubjectError::InvalidEventType(event_type.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Any,
    Tail,
}

/// Parsed subject filter such as `game.>` or `game.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFilter {
    raw: String,
    tokens: Vec<Token>,
}

impl SubjectFilter {
    /// Matches every game subject (`game.>`).
    pub fn all() -> Self {
        Self {
            raw: format!("{SUBJECT_ROOT}.>"),
            tokens: vec![Token::Literal(SUBJECT_ROOT.to_string()), Token::Tail],
        }
    }

    /// Matches exactly one event type.
    pub fn event_type(event_type: &str) -> Result<Self, SubjectError> {
        validate_event_type(event_type)?;
        subject_for(event_type).parse()
    }

    pub fn matches(&self, subject: &str) -> bool {
        let mut parts = subject.split('.');
        for token in &self.tokens {
            match token {
                Token::Tail => return parts.next().is_some(),
                Token::Any => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Token::Literal(expected) => {
                    if parts.next() != Some(expected.as_str()) {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for SubjectFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for SubjectFilter {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SubjectError::Empty);
        }

        let parts: Vec<&str> = s.split('.').collect();
        let last = parts.len() - 1;
        let tokens = parts
            .iter()
            .enumerate()
            .map(|(i, part)| match *part {
                "" => Err(SubjectError::EmptyToken(s.to_string())),
                ">" if i == last => Ok(Token::Tail),
                ">" => Err(SubjectError::MisplacedTail(s.to_string())),
                "*" => Ok(Token::Any),
                literal => Ok(Token::Literal(literal.to_string())),
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            raw: s.to_string(),
            tokens,
        })
    }
}

impl fmt::Display for SubjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_wildcard_needs_at_least_one_token() {
        let filter = SubjectFilter::all();
        assert!(filter.matches("game.bit_placed"));
        assert!(filter.matches("game.a.b"));
        assert!(!filter.matches("game"));
        assert!(!filter.matches("other.bit_placed"));
    }

    #[test]
    fn single_wildcard_matches_one_token() {
        let filter: SubjectFilter = "game.*".parse().unwrap();
        assert!(filter.matches("game.round_reset"));
        assert!(!filter.matches("game.a.b"));
        assert!(!filter.matches("game"));
    }

    #[test]
    fn literal_filters_are_exact() {
        let filter = SubjectFilter::event_type("bit_placed").unwrap();
        assert!(filter.matches("game.bit_placed"));
        assert!(!filter.matches("game.bit_placed.extra"));
        assert!(!filter.matches("game.player_join"));
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert_eq!("".parse::<SubjectFilter>(), Err(SubjectError::Empty));
        assert!(matches!(
            "game..x".parse::<SubjectFilter>(),
            Err(SubjectError::EmptyToken(_))
        ));
        assert!(matches!(
            "game.>.x".parse::<SubjectFilter>(),
            Err(SubjectError::MisplacedTail(_))
        ));
        assert!(validate_event_type("chat.message").is_err());
        assert!(validate_event_type("chat_message").is_ok());
    }
}
