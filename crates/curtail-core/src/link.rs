use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

/// A validated short code identifier for a shortened URL.
///
/// Codes are 3-32 characters drawn from the 62-symbol alphanumeric
/// alphabet. Generated codes are always 8 characters; the wider bound
/// exists so codes replayed from older logs keep resolving.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Creates a new `ShortCode` after validating the input.
    pub fn new(code: impl Into<String>) -> std::result::Result<Self, StoreError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (e.g. the code generators).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    fn validate(code: &str) -> std::result::Result<(), StoreError> {
        if code.len() < MIN_LENGTH || code.len() > MAX_LENGTH {
            return Err(StoreError::InvalidCode(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                code.len()
            )));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::InvalidCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The outcome of saving a URL.
///
/// Saving an already-known URL is not a failure: content-deduplicating
/// backends return the existing code together with the conflict signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new mapping was created under this code.
    Created(ShortCode),
    /// The URL was already stored; this is its existing code.
    Existing(ShortCode),
}

impl SaveOutcome {
    /// The short code for the URL, whether freshly created or pre-existing.
    pub fn code(&self) -> &ShortCode {
        match self {
            SaveOutcome::Created(code) | SaveOutcome::Existing(code) => code,
        }
    }

    /// Whether the URL was already stored under another save.
    pub fn is_existing(&self) -> bool {
        matches!(self, SaveOutcome::Existing(_))
    }

    /// Consumes the outcome, returning the code.
    pub fn into_code(self) -> ShortCode {
        match self {
            SaveOutcome::Created(code) | SaveOutcome::Existing(code) => code,
        }
    }
}

/// One entry of a batch insert.
///
/// The code is a hint produced up front by the caller; backends skip
/// entries whose code (or URL) is already taken instead of overwriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub code: ShortCode,
    pub original_url: String,
    /// Client-supplied token used only to correlate batch requests to
    /// their results; not part of the record's identity.
    pub correlation_id: String,
}

/// A live (non-deleted) link owned by a user, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLink {
    pub code: ShortCode,
    pub original_url: String,
}
