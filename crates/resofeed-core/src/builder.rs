//! Feed assembly.
//!
//! The builder validates construction input, derives admission defaults from
//! the provider tuning table, and wires the hook pipeline in its fixed
//! order: admission gate, then auth, then caller-supplied hooks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::{AdmissionConfig, AdmissionQueue};
use crate::auth::{AuthOptions, CredentialProvider};
use crate::error::FeedError;
use crate::feed::Feed;
use crate::hooks::{AdmissionHook, AuthHook, RequestHook};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::provider::KnownProvider;

/// Caller overrides for the admission window; unset fields fall back to the
/// provider tuning table, then to the global defaults (60 s / 100 points).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterOptions {
    pub duration: Option<Duration>,
    pub points: Option<u32>,
}

/// Builder for [`Feed`]. A base URL is required; everything else is
/// optional. Construction never performs a network call.
#[derive(Default)]
pub struct FeedBuilder {
    base_url: Option<String>,
    headers: BTreeMap<String, String>,
    limiter: Option<LimiterOptions>,
    auth: Option<AuthOptions>,
    hooks: Vec<Arc<dyn RequestHook>>,
    http: Option<Arc<dyn HttpClient>>,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn limiter(mut self, options: LimiterOptions) -> Self {
        self.limiter = Some(options);
        self
    }

    pub fn auth(mut self, options: AuthOptions) -> Self {
        self.auth = Some(options);
        self
    }

    /// Appends a caller hook; these run after the built-in admission and
    /// auth hooks, in the order added.
    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Injects a transport; defaults to [`ReqwestHttpClient`].
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<Feed, FeedError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(FeedError::MissingBaseUrl)?;

        let http: Arc<dyn HttpClient> = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let provider = KnownProvider::from_base_url(&base_url);
        let queue = resolve_admission(self.limiter, provider).map(AdmissionQueue::new);

        let mut hooks: Vec<Arc<dyn RequestHook>> = Vec::new();

        if let Some(queue) = &queue {
            hooks.push(Arc::new(AdmissionHook::new(queue.clone())));
        }

        if let Some(auth) = self.auth {
            let credentials = Arc::new(CredentialProvider::new(auth, http.clone()));
            hooks.push(Arc::new(AuthHook::new(credentials, queue.clone())));
        }

        hooks.extend(self.hooks);

        if let Some(provider) = provider {
            tracing::debug!(%provider, "applying provider admission defaults");
        }

        Ok(Feed::new(base_url, self.headers, hooks, http))
    }
}

/// A queue exists when the caller asked for one or the provider table implies
/// one; explicit overrides win over table values, which win over the global
/// defaults.
fn resolve_admission(
    limiter: Option<LimiterOptions>,
    provider: Option<KnownProvider>,
) -> Option<AdmissionConfig> {
    let table = provider.map(KnownProvider::admission_config);

    match (limiter, table) {
        (None, None) => None,
        (None, Some(config)) => Some(config),
        (Some(options), table) => {
            let fallback = table.unwrap_or_default();
            Some(AdmissionConfig {
                duration: options.duration.unwrap_or(fallback.duration),
                points: options.points.unwrap_or(fallback.points),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::NoopHttpClient;

    #[test]
    fn build_requires_a_base_url() {
        let error = FeedBuilder::new().build().expect_err("must fail");
        assert_eq!(error, FeedError::MissingBaseUrl);

        let error = FeedBuilder::new()
            .base_url("   ")
            .build()
            .expect_err("must fail");
        assert_eq!(error, FeedError::MissingBaseUrl);
    }

    #[test]
    fn build_wires_a_feed_without_optional_parts() {
        let feed = FeedBuilder::new()
            .base_url("https://my-reso-api.test/odata/")
            .http_client(Arc::new(NoopHttpClient))
            .build()
            .expect("builder should succeed");

        assert_eq!(feed.base_url(), "https://my-reso-api.test/odata");
    }

    #[test]
    fn explicit_limiter_overrides_win_over_the_provider_table() {
        let config = resolve_admission(
            Some(LimiterOptions {
                duration: None,
                points: Some(10),
            }),
            Some(KnownProvider::Spark),
        )
        .expect("config should exist");

        assert_eq!(config.points, 10);
        assert_eq!(config.duration, Duration::from_secs(60));
    }

    #[test]
    fn recognized_provider_implies_an_admission_queue() {
        let config = resolve_admission(None, Some(KnownProvider::MlsGrid))
            .expect("provider table should apply");
        assert_eq!(config.points, 120);
    }

    #[test]
    fn unrecognized_host_without_limiter_options_gets_no_queue() {
        assert_eq!(resolve_admission(None, None), None);
    }

    #[test]
    fn bare_limiter_options_fall_back_to_global_defaults() {
        let config = resolve_admission(Some(LimiterOptions::default()), None)
            .expect("config should exist");
        assert_eq!(config, AdmissionConfig::default());
    }
}
