//! Contract tests for the credential provider and the assembly pipeline.
//!
//! Both credential strategies must honor the shared three-part contract,
//! and assembly must order hooks so header injection observes the
//! post-refresh token before any caller hook runs.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use resofeed_core::{
    AdmissionConfig, AuthOptions, CredentialProvider, Feed, HttpClient, HttpError, HttpRequest,
    HttpResponse, LimiterOptions, RequestContext, RequestHook,
};

struct CountingHttpClient {
    body: &'static str,
    calls: Mutex<usize>,
}

impl CountingHttpClient {
    fn new(body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().expect("call counter should not be poisoned")
    }
}

impl HttpClient for CountingHttpClient {
    fn execute<'a>(
        &'a self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        *self.calls.lock().expect("call counter should not be poisoned") += 1;
        let body = self.body;
        Box::pin(async move { Ok(HttpResponse::ok_json(body)) })
    }
}

#[tokio::test]
async fn bearer_contract_never_expires_and_never_touches_the_network() {
    let http = CountingHttpClient::new("{}");
    let provider = CredentialProvider::new(
        AuthOptions::Bearer {
            token: String::from("t"),
            token_type: Some(String::from("Basic")),
        },
        http.clone(),
    );

    assert!(!provider.is_expired());
    provider.refresh().await.expect("no-op refresh");
    let token = provider.get_token().await.expect("token exists");

    assert_eq!(token.token_type, "Basic");
    assert_eq!(http.calls(), 0);
}

#[tokio::test]
async fn client_credentials_contract_refreshes_exactly_once_per_expiry() {
    let http = CountingHttpClient::new(r#"{"access_token":"at","expires_in":3600}"#);
    let provider = CredentialProvider::new(
        AuthOptions::ClientCredentials {
            token_url: String::from("https://auth.test/token"),
            client_id: String::from("id"),
            client_secret: String::from("secret"),
            scope: None,
            grant_type: None,
            refresh_buffer_ms: None,
        },
        http.clone(),
    );

    assert!(provider.is_expired(), "fresh credentials start expired");

    provider.get_token().await.expect("token exists");
    assert!(!provider.is_expired());
    assert_eq!(http.calls(), 1);

    provider.get_token().await.expect("token is still live");
    assert_eq!(http.calls(), 1, "live token must not re-refresh");
}

/// Records whether the authorization header was already present when the
/// caller hook ran.
struct HeaderProbe {
    saw_authorization: Mutex<Option<bool>>,
}

impl RequestHook for HeaderProbe {
    fn run<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), resofeed_core::FeedError>> + Send + 'a>> {
        Box::pin(async move {
            *self
                .saw_authorization
                .lock()
                .expect("probe should not be poisoned") =
                Some(ctx.headers.contains_key("authorization"));
            Ok(())
        })
    }
}

#[tokio::test]
async fn caller_hooks_run_after_admission_and_auth() {
    let http = CountingHttpClient::new(r#"{"value":[]}"#);
    let probe = Arc::new(HeaderProbe {
        saw_authorization: Mutex::new(None),
    });

    let feed = Feed::builder()
        .base_url("https://my-reso-api.test/odata")
        .limiter(LimiterOptions::default())
        .auth(AuthOptions::Bearer {
            token: String::from("t"),
            token_type: None,
        })
        .hook(probe.clone())
        .http_client(http)
        .build()
        .expect("builder should succeed");

    feed.request("/Property", &[]).await.expect("request should succeed");

    assert_eq!(
        *probe
            .saw_authorization
            .lock()
            .expect("probe should not be poisoned"),
        Some(true),
        "auth hook must have injected the header before caller hooks ran"
    );
}

#[test]
fn default_admission_configuration_matches_the_contract() {
    let config = AdmissionConfig::default();
    assert_eq!(config.duration, std::time::Duration::from_secs(60));
    assert_eq!(config.points, 100);
}
