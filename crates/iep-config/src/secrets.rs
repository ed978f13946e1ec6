//! Secret resolution with parameter-store fallback.
//!
//! Grounded on `open_ai_agent.py`'s `_get_openai_api_key`: prefer a literal
//! environment variable, but treat a KMS-ciphertext-looking value (the
//! `AQICA` prefix Secrets Manager/KMS ciphertexts share) as unusable and
//! fall through to the parameter-store lookup. A resolved value is cached
//! for the life of the process so repeated steps don't re-fetch it.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// A resolved secret, tagged with where it came from for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Literal(String),
    ParameterStore(String),
}

impl SecretValue {
    pub fn value(&self) -> &str {
        match self {
            SecretValue::Literal(v) => v,
            SecretValue::ParameterStore(v) => v,
        }
    }
}

/// Fetches a secret's plaintext value given a parameter-store name. Kept as
/// a trait so `iep-config` stays free of an AWS SDK dependency; the actual
/// SSM-backed implementation lives with the rest of the AWS wiring in
/// `iep-storage`.
pub trait SecretSource: Send + Sync {
    fn fetch(&self, parameter_name: &str) -> anyhow::Result<String>;
}

/// A `SecretSource` used in tests and local runs where no parameter store
/// is reachable.
pub struct NoopSecretSource;

impl SecretSource for NoopSecretSource {
    fn fetch(&self, parameter_name: &str) -> anyhow::Result<String> {
        anyhow::bail!(
            "no secret source configured; cannot resolve parameter '{}'",
            parameter_name
        )
    }
}

static CACHE: Lazy<Mutex<HashMap<String, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Values that look like ciphertext rather than a usable plaintext key.
/// `AQICA` is the common prefix of KMS-encrypted blobs stored alongside an
/// env var as a stale placeholder.
fn looks_like_ciphertext(value: &str) -> bool {
    value.starts_with("AQICA")
}

pub struct SecretResolver<'a> {
    source: &'a dyn SecretSource,
}

impl<'a> SecretResolver<'a> {
    pub fn new(source: &'a dyn SecretSource) -> Self {
        Self { source }
    }

    /// Resolve a secret given its literal value (if any) and its
    /// parameter-store name (if any), preferring the literal unless it
    /// looks like ciphertext. Resolved values are cached by parameter name.
    pub fn resolve(
        &self,
        literal: Option<&str>,
        parameter_name: Option<&str>,
    ) -> anyhow::Result<SecretValue> {
        if let Some(literal) = literal {
            if !literal.is_empty() && !looks_like_ciphertext(literal) {
                return Ok(SecretValue::Literal(literal.to_string()));
            }
        }

        let parameter_name = parameter_name.ok_or_else(|| {
            anyhow::anyhow!("secret unavailable: no usable literal value and no parameter name configured")
        })?;

        if let Some(cached) = CACHE.lock().unwrap().get(parameter_name) {
            return Ok(SecretValue::ParameterStore(cached.clone()));
        }

        let value = self.source.fetch(parameter_name)?;
        CACHE
            .lock()
            .unwrap()
            .insert(parameter_name.to_string(), value.clone());
        Ok(SecretValue::ParameterStore(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource;
    impl SecretSource for FakeSource {
        fn fetch(&self, parameter_name: &str) -> anyhow::Result<String> {
            Ok(format!("resolved-{}", parameter_name))
        }
    }

    #[test]
    fn prefers_literal_when_usable() {
        let source = FakeSource;
        let resolver = SecretResolver::new(&source);
        let resolved = resolver.resolve(Some("sk-live-key"), Some("/iep/openai")).unwrap();
        assert_eq!(resolved, SecretValue::Literal("sk-live-key".to_string()));
    }

    #[test]
    fn falls_back_to_parameter_store_for_ciphertext_placeholder() {
        let source = FakeSource;
        let resolver = SecretResolver::new(&source);
        let resolved = resolver
            .resolve(Some("AQICAHhplaceholder"), Some("/iep/openai"))
            .unwrap();
        assert_eq!(
            resolved,
            SecretValue::ParameterStore("resolved-/iep/openai".to_string())
        );
    }

    #[test]
    fn errors_without_any_source() {
        let source = NoopSecretSource;
        let resolver = SecretResolver::new(&source);
        assert!(resolver.resolve(None, None).is_err());
    }
}
