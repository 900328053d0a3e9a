//! Output assertions
//!
//! Patterns are regular expressions matched anywhere in the command
//! output. Fatal checks return an error on mismatch; non-fatal checks
//! return a plain boolean for use inside poll attempts.

use regex::Regex;

use crate::common::{Error, Result};

/// A compiled output pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(source).map_err(|e| Error::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Non-fatal: whether `output` contains a match
    pub fn matches(&self, output: &str) -> bool {
        self.regex.is_match(output)
    }

    /// Fatal: `AssertionMismatch` naming `context` unless `output` matches
    pub fn expect(&self, output: &str, context: &str) -> Result<()> {
        if self.matches(output) {
            Ok(())
        } else {
            Err(Error::assertion_mismatch(context, &self.source, output))
        }
    }
}

/// Non-fatal match of `output` against an uncompiled pattern
pub fn matches(output: &str, pattern: &str) -> Result<bool> {
    Ok(Pattern::new(pattern)?.matches(output))
}

/// Fatal match of `output` against an uncompiled pattern
pub fn expect_match(output: &str, pattern: &str, context: &str) -> Result<()> {
    Pattern::new(pattern)?.expect(output, context)
}
