// Identifier derivation from the upload key convention and execution-name
// dedupe (spec.md §4.9): `sha256(iepId + correlationId)[..16]`, the same
// intent as the original's random-suffix `execution_name`, made
// deterministic so it can be asserted on in tests.

use sha2::{Digest, Sha256};

use crate::error::IngressError;

/// Splits `userId/childId/iepId/filename` into its three identifiers. The
/// filename segment (which may itself contain slashes) is everything after
/// the third `/`.
pub fn derive_identifiers(key: &str) -> Result<(String, String, String), IngressError> {
    let decoded = urlencoding::decode(key)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| key.to_string());

    let mut parts = decoded.splitn(4, '/');
    let user_id = parts.next().filter(|s| !s.is_empty());
    let child_id = parts.next().filter(|s| !s.is_empty());
    let iep_id = parts.next().filter(|s| !s.is_empty());
    let filename = parts.next();

    match (user_id, child_id, iep_id, filename) {
        (Some(u), Some(c), Some(i), Some(_)) => Ok((u.to_string(), c.to_string(), i.to_string())),
        _ => Err(IngressError::MalformedKey(key.to_string())),
    }
}

/// Deterministic execution-name dedupe key, used by the workflow engine's
/// caller to avoid starting two executions for the same retried event.
pub fn execution_name(iep_id: &str, correlation_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(iep_id.as_bytes());
    hasher.update(correlation_id.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_identifiers_from_key_path() {
        let (user_id, child_id, iep_id) = derive_identifiers("user-1/child-1/iep-1/scan.pdf").unwrap();
        assert_eq!(user_id, "user-1");
        assert_eq!(child_id, "child-1");
        assert_eq!(iep_id, "iep-1");
    }

    #[test]
    fn url_decodes_the_key_first() {
        let (user_id, child_id, iep_id) = derive_identifiers("user%201/child-1/iep-1/scan.pdf").unwrap();
        assert_eq!(user_id, "user 1");
        assert_eq!(child_id, "child-1");
        assert_eq!(iep_id, "iep-1");
    }

    #[test]
    fn preserves_slashes_within_the_filename_segment() {
        let (_, _, iep_id) = derive_identifiers("user-1/child-1/iep-1/folder/scan.pdf").unwrap();
        assert_eq!(iep_id, "iep-1");
    }

    #[test]
    fn rejects_keys_with_too_few_segments() {
        assert!(derive_identifiers("child-1/scan.pdf").is_err());
    }

    #[test]
    fn execution_name_is_deterministic_and_16_hex_chars() {
        let a = execution_name("iep-1", "req-abc");
        let b = execution_name("iep-1", "req-abc");
        let c = execution_name("iep-1", "req-xyz");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
