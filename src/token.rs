//! Classification of raw argv tokens.

/// A raw argument token, split by its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `--name`; the name is empty for a bare `--`
    Long(&'a str),
    /// `-abc`; a cluster of short flags, empty for a bare `-`
    Short(&'a str),
    Positional(&'a str),
}

pub fn classify(token: &str) -> Token<'_> {
    if let Some(name) = token.strip_prefix("--") {
        Token::Long(name)
    } else if let Some(cluster) = token.strip_prefix('-') {
        Token::Short(cluster)
    } else {
        Token::Positional(token)
    }
}
