use std::fmt::{self, Debug};

/// The endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/v1/chat/completions";

/// Builder for [`OpenAIConfig`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    raw_events: bool,
}

impl OpenAIConfigBuilder {
    /// Creates an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key sent as a bearer token.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the model to use. Local servers usually ignore it.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the full URL of the chat-completion endpoint.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Makes responses echo each undecoded event payload.
    #[inline]
    pub fn with_raw_events(mut self, raw_events: bool) -> Self {
        self.raw_events = raw_events;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        OpenAIConfig {
            api_key: self.api_key.filter(|key| !key.is_empty()),
            model: self.model.filter(|model| !model.is_empty()),
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            raw_events: self.raw_events,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("raw_events", &self.raw_events)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) endpoint: String,
    pub(crate) raw_events: bool,
}

impl OpenAIConfig {
    /// Returns the endpoint requests are posted to.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the configured model, if any.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("raw_events", &self.raw_events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OpenAIConfigBuilder::new().build();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.model(), None);
        assert_eq!(config.api_key, None);
        assert!(!config.raw_events);
    }

    #[test]
    fn test_empty_key_is_no_key() {
        let config = OpenAIConfigBuilder::new().with_api_key("").build();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = OpenAIConfigBuilder::new()
            .with_api_key("sk-secret")
            .with_model("qwen")
            .build();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("qwen"));
    }
}
