use crate::CodeGenerator;
use curtail_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic sequential generator for tests.
///
/// Produces codes like "sq000000", "sq000001", ... so assertions can
/// name exact codes. The prefix plus six counter digits keeps codes at
/// the production length of 8 when the prefix is two characters.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    /// Creates a sequential generator with the given prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix: prefix.into(),
        }
    }
}

impl CodeGenerator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}
