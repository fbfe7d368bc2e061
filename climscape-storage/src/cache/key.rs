//! Composite cache keys.
//!
//! A composite key is an ordered tuple of optional string tokens. The cache
//! hashes the typed [`CompositeKey`] directly; the string encoding exists
//! for resource paths, logs and anything that must cross a process
//! boundary.

use std::fmt;

use climscape_core::EncodingError;

/// Separator between encoded tokens.
pub const SEPARATOR: char = ';';

/// Encoded stand-in for an absent token.
pub const ABSENT: &str = "_";

fn validate(position: usize, token: &str) -> Result<(), EncodingError> {
    if token.is_empty() {
        return Err(EncodingError::EmptyToken { position });
    }
    if token == ABSENT {
        return Err(EncodingError::SentinelToken {
            position,
            sentinel: ABSENT.to_string(),
        });
    }
    if token.contains(SEPARATOR) {
        return Err(EncodingError::SeparatorInToken {
            position,
            token: token.to_string(),
            separator: SEPARATOR,
        });
    }
    Ok(())
}

/// Join tokens with [`SEPARATOR`], writing [`ABSENT`] for `None`.
///
/// Fails when a token is empty, equals the sentinel or contains the
/// separator: any of those would break the round trip through [`decode`].
pub fn encode(tokens: &[Option<&str>]) -> Result<String, EncodingError> {
    let mut out = String::new();
    for (position, token) in tokens.iter().enumerate() {
        if position > 0 {
            out.push(SEPARATOR);
        }
        match token {
            Some(token) => {
                validate(position, token)?;
                out.push_str(token);
            }
            None => out.push_str(ABSENT),
        }
    }
    Ok(out)
}

/// Inverse of [`encode`]. The empty string decodes to no tokens.
pub fn decode(key: &str) -> Vec<Option<String>> {
    if key.is_empty() {
        return Vec::new();
    }
    key.split(SEPARATOR)
        .map(|token| {
            if token == ABSENT {
                None
            } else {
                Some(token.to_string())
            }
        })
        .collect()
}

/// Validated tuple of optional tokens, usable as a cache key.
///
/// Construction checks every token, so a `CompositeKey` always encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    tokens: Vec<Option<String>>,
}

impl CompositeKey {
    /// Build a key from tokens, rejecting any that cannot be encoded.
    pub fn new<I, S>(tokens: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let tokens: Vec<Option<String>> = tokens
            .into_iter()
            .map(|t| t.map(Into::into))
            .collect();
        for (position, token) in tokens.iter().enumerate() {
            if let Some(token) = token {
                validate(position, token)?;
            }
        }
        Ok(Self { tokens })
    }

    /// Build a key where every token is present.
    pub fn of<S: AsRef<str>>(tokens: &[S]) -> Result<Self, EncodingError> {
        Self::new(tokens.iter().map(|t| Some(t.as_ref())))
    }

    /// Decode an encoded key, rejecting empty tokens such as the middle
    /// of `"a;;b"`.
    pub fn parse(key: &str) -> Result<Self, EncodingError> {
        Self::new(decode(key))
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (position, token) in self.tokens.iter().enumerate() {
            if position > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(token.as_deref().unwrap_or(ABSENT));
        }
        out
    }

    pub fn tokens(&self) -> &[Option<String>] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`, `None` when absent or out of range.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).and_then(|t| t.as_deref())
    }

    /// Check the number of tokens, returning the tokens on success.
    ///
    /// Used by fetchers that parse a key built by a known orchestrator.
    pub fn expect_arity(&self, expected: usize) -> Result<&[Option<String>], (usize, usize)> {
        if self.tokens.len() == expected {
            Ok(&self.tokens)
        } else {
            Err((expected, self.tokens.len()))
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
