//! The quick-access code that grants a dashboard session.
//!
//! The code is supplied through configuration and only its SHA-512 digest is
//! kept in memory. Verification compares digests over their full length so
//! the comparison time does not depend on where the candidate diverges.

use sha2::{Digest, Sha512};

/// A configuration-supplied access code, held as a SHA-512 digest.
#[derive(Clone)]
pub struct AccessCode {
    digest: [u8; 64],
}

impl AccessCode {
    /// Create an access code from the plaintext `code`.
    pub fn new(code: &str) -> Self {
        Self {
            digest: Sha512::digest(code).into(),
        }
    }

    /// Check whether `candidate` matches this access code.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate_digest: [u8; 64] = Sha512::digest(candidate).into();

        constant_time_eq(&self.digest, &candidate_digest)
    }
}

impl std::fmt::Debug for AccessCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the digest, it is all an attacker would need offline.
        f.write_str("AccessCode(..)")
    }
}

/// Compare two equal-length byte slices without short-circuiting.
pub(crate) fn constant_time_eq(left: &[u8; 64], right: &[u8; 64]) -> bool {
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Check whether two secret strings are equal, in time independent of where
/// they differ.
///
/// Used for the stored admin code, which the user can change at runtime.
pub fn secrets_match(stored: &str, candidate: &str) -> bool {
    let stored_digest: [u8; 64] = Sha512::digest(stored).into();
    let candidate_digest: [u8; 64] = Sha512::digest(candidate).into();

    constant_time_eq(&stored_digest, &candidate_digest)
}
