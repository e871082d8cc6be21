//! Pre-request hook pipeline.
//!
//! Hooks are an ordered sequence of middleware applied to one shared,
//! mutable [`RequestContext`] before the transport call. Registration order
//! is execution order; the assembly wires admission before auth so header
//! injection always observes the post-refresh token.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::admission::AdmissionQueue;
use crate::auth::CredentialProvider;
use crate::error::FeedError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Mutable request state threaded through the hook pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            query,
            headers: BTreeMap::new(),
        }
    }
}

/// One stage of the pre-request pipeline.
pub trait RequestHook: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), FeedError>>;
}

/// Gates the request on the admission queue: enqueues a no-op task that
/// resolves once admission is granted, throttling issue rate.
pub struct AdmissionHook {
    queue: AdmissionQueue,
}

impl AdmissionHook {
    pub fn new(queue: AdmissionQueue) -> Self {
        Self { queue }
    }
}

impl RequestHook for AdmissionHook {
    fn run<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), FeedError>> {
        Box::pin(async move {
            self.queue.add(|| async {}).await;
            Ok(())
        })
    }
}

/// Checks credential liveness, refreshes behind a queue pause/start bracket,
/// and injects the `Authorization` header.
///
/// The bracket makes refresh exclusive with respect to this feed's own
/// admissions only; callers sharing the provider outside this pipeline are
/// unguarded.
pub struct AuthHook {
    credentials: Arc<CredentialProvider>,
    queue: Option<AdmissionQueue>,
}

impl AuthHook {
    pub fn new(credentials: Arc<CredentialProvider>, queue: Option<AdmissionQueue>) -> Self {
        Self { credentials, queue }
    }
}

impl RequestHook for AuthHook {
    fn run<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), FeedError>> {
        Box::pin(async move {
            if self.credentials.is_expired() {
                if let Some(queue) = &self.queue {
                    queue.pause();
                }

                let refreshed = self.credentials.refresh().await;

                if let Some(queue) = &self.queue {
                    queue.start();
                }

                refreshed?;
            }

            let token = self.credentials.get_token().await?;
            ctx.headers.insert(
                String::from("authorization"),
                format!("{} {}", token.token_type, token.token),
            );

            Ok(())
        })
    }
}
