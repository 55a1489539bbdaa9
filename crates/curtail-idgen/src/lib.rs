//! Short code generators for the Curtail URL shortener.
//!
//! Generators are pure: they never consult storage, so they make no
//! uniqueness guarantee. Collision handling is a backend concern.

pub mod seq;

use curtail_core::ShortCode;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generated codes are 8 characters unless configured otherwise.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Trait for generating short codes.
///
/// Implementations must be safe for concurrent use from any number of
/// request-serving tasks.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Produces the next candidate short code.
    fn generate(&self) -> ShortCode;
}

/// Random code generator drawing uniformly from the 62-symbol
/// alphanumeric alphabet (a-z, A-Z, 0-9).
///
/// Each call samples the calling thread's own seeded RNG, so no
/// synchronization is needed between concurrent callers.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator producing codes of the default length.
    pub fn new() -> Self {
        Self::with_length(DEFAULT_CODE_LENGTH)
    }

    /// Creates a generator producing codes of the given length.
    pub fn with_length(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
