//! Per-call import options

use crate::error::{MigrationError, MigrationResult};
use cmig_store::WriteOptions;
use std::fmt;

/// Import flags
#[derive(Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Activate written revisions
    pub activate: bool,
    /// Comment attached to written revisions
    pub version_comment: Option<String>,
    /// Resolve and report, then roll back
    pub test: bool,
    /// Passphrase for sealed secrets
    pub passphrase: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            activate: true,
            version_comment: None,
            test: false,
            passphrase: None,
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("activate", &self.activate)
            .field("version_comment", &self.version_comment)
            .field("test", &self.test)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ImportOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With activation on or off
    #[inline]
    #[must_use]
    pub fn with_activate(mut self, activate: bool) -> Self {
        self.activate = activate;
        self
    }

    /// With version comment
    #[inline]
    #[must_use]
    pub fn with_version_comment(mut self, comment: impl Into<String>) -> Self {
        self.version_comment = Some(comment.into());
        self
    }

    /// Dry run
    #[inline]
    #[must_use]
    pub fn test_mode(mut self) -> Self {
        self.test = true;
        self
    }

    /// With passphrase
    #[inline]
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Parse `activate=false&versionComment=release-7&test=true`
    ///
    /// # Errors
    ///
    /// Unknown flags and malformed booleans.
    pub fn from_query(query: &str) -> MigrationResult<Self> {
        let mut options = Self::default();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, "true"));
            match key {
                "activate" => options.activate = parse_flag(key, value)?,
                "test" => options.test = parse_flag(key, value)?,
                "versionComment" => options.version_comment = Some(value.to_string()),
                other => {
                    return Err(MigrationError::InvalidOption(format!("unknown flag '{other}'")))
                }
            }
        }
        Ok(options)
    }

    /// Options handed to the store on each write
    #[must_use]
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            activate: self.activate,
            version_comment: self.version_comment.clone(),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> MigrationResult<bool> {
    value
        .parse()
        .map_err(|_| MigrationError::InvalidOption(format!("{key}={value} is not a boolean")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_query() {
        let options = ImportOptions::from_query("?activate=false&versionComment=release-7&test").unwrap();
        assert!(!options.activate);
        assert!(options.test);
        assert_eq!(options.version_comment.as_deref(), Some("release-7"));

        assert!(ImportOptions::from_query("").unwrap().activate);
        assert!(ImportOptions::from_query("activate=maybe").is_err());
        assert!(ImportOptions::from_query("force=true").is_err());
    }

    #[test]
    fn test_debug_masks_passphrase() {
        let rendered = format!("{:?}", ImportOptions::new().with_passphrase("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_write_options() {
        let write = ImportOptions::new()
            .with_activate(false)
            .with_version_comment("c")
            .write_options();
        assert_eq!(write, WriteOptions::default().with_comment("c"));
    }
}
