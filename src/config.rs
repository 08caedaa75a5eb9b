//! Provider configuration
//!
//! Credentials and endpoints are explicit constructor inputs. The `from_env`
//! loaders read the conventional variables as a convenience but never mutate
//! the environment; nothing in this crate sets a global key.

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ProviderError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Connection settings for one OpenAI-compatible provider endpoint.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Short provider label used in logs and error text
    pub provider_id: String,
    pub api_key: SecretString,
    /// Base URL up to but excluding `/chat/completions`
    pub base_url: String,
    /// Whole-request timeout applied to the HTTP client
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Configuration for an arbitrary OpenAI-compatible endpoint.
    pub fn openai_compatible(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: SecretString::from(api_key.into()),
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// OpenAI's own endpoint.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::openai_compatible("openai", api_key, OPENAI_BASE_URL)
    }

    /// Anthropic's OpenAI-compatible endpoint.
    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self::openai_compatible("anthropic", api_key, ANTHROPIC_BASE_URL)
    }

    /// Google's OpenAI-compatible Gemini endpoint.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::openai_compatible("gemini", api_key, GEMINI_BASE_URL)
    }

    /// OpenAI configuration from `OPENAI_API_KEY`.
    pub fn openai_from_env() -> Result<Self, ProviderError> {
        Ok(Self::openai(env_key("OPENAI_API_KEY")?))
    }

    /// Anthropic configuration from `ANTHROPIC_API_KEY`.
    pub fn anthropic_from_env() -> Result<Self, ProviderError> {
        Ok(Self::anthropic(env_key("ANTHROPIC_API_KEY")?))
    }

    /// Gemini configuration from `GOOGLE_API_KEY`.
    pub fn gemini_from_env() -> Result<Self, ProviderError> {
        Ok(Self::gemini(env_key("GOOGLE_API_KEY")?))
    }

    /// Point at a different base URL (proxies, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn env_key(var: &str) -> Result<String, ProviderError> {
    std::env::var(var)
        .map_err(|_| ProviderError::Configuration(format!("{var} is not set")))
        .and_then(|value| {
            if value.trim().is_empty() {
                Err(ProviderError::Configuration(format!("{var} is empty")))
            } else {
                Ok(value)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_api_key() {
        let config = ProviderConfig::openai("sk-super-secret");
        let printed = format!("{config:?}");
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("sk-super-secret"));
    }

    #[test]
    fn presets_point_at_the_expected_endpoints() {
        assert_eq!(ProviderConfig::openai("k").base_url, OPENAI_BASE_URL);
        assert_eq!(ProviderConfig::anthropic("k").base_url, ANTHROPIC_BASE_URL);
        assert_eq!(ProviderConfig::gemini("k").base_url, GEMINI_BASE_URL);
    }

    #[test]
    fn missing_env_var_is_a_configuration_error() {
        // Use a variable name no environment will have set.
        let err = match std::env::var("REFRAIN_TEST_NO_SUCH_KEY") {
            Err(_) => env_key("REFRAIN_TEST_NO_SUCH_KEY").unwrap_err(),
            Ok(_) => return,
        };
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
