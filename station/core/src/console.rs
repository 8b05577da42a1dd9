//! Operator Console Commands
//!
//! Parses one operator input line into an [`OperatorCommand`]. The grammar is
//! whitespace-separated words; the first word selects the command.

use std::path::PathBuf;

/// A parsed operator command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// `load_cards <path>` / `lc <path>`: submit a deck on the configured reader
    LoadCards {
        /// Deck to submit
        path: PathBuf,
    },
    /// `exit` / `quit`
    Quit,
    /// Empty or whitespace-only line
    Blank,
    /// `load_cards` with no path
    MissingFileName,
    /// Anything else
    Unrecognized {
        /// First word of the line
        verb: String,
    },
}

impl OperatorCommand {
    /// Parse a console line
    ///
    /// Words after the deck path are ignored.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Self::Blank;
        };

        match verb {
            "load_cards" | "lc" => match words.next() {
                Some(path) => Self::LoadCards {
                    path: PathBuf::from(path),
                },
                None => Self::MissingFileName,
            },
            "exit" | "quit" => Self::Quit,
            other => Self::Unrecognized {
                verb: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_cards() {
        let expected = OperatorCommand::LoadCards {
            path: PathBuf::from("jobs/deck.jcl"),
        };
        assert_eq!(OperatorCommand::parse("load_cards jobs/deck.jcl"), expected);
        assert_eq!(OperatorCommand::parse("lc jobs/deck.jcl"), expected);
        assert_eq!(OperatorCommand::parse("  lc   jobs/deck.jcl  extra\n"), expected);
    }

    #[test]
    fn test_missing_file_name() {
        assert_eq!(
            OperatorCommand::parse("load_cards"),
            OperatorCommand::MissingFileName
        );
        assert_eq!(OperatorCommand::parse("lc   "), OperatorCommand::MissingFileName);
    }

    #[test]
    fn test_quit() {
        assert_eq!(OperatorCommand::parse("exit"), OperatorCommand::Quit);
        assert_eq!(OperatorCommand::parse("quit\n"), OperatorCommand::Quit);
    }

    #[test]
    fn test_blank() {
        assert_eq!(OperatorCommand::parse(""), OperatorCommand::Blank);
        assert_eq!(OperatorCommand::parse(" \t\n"), OperatorCommand::Blank);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            OperatorCommand::parse("LC deck.jcl"),
            OperatorCommand::Unrecognized {
                verb: "LC".to_string()
            }
        );
    }
}
