//! Feed client: one `request` primitive with `read_by_id`, `read_by_query`
//! pagination and `$metadata` built on top of it.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use url::Url;

use crate::builder::FeedBuilder;
use crate::error::FeedError;
use crate::hooks::{RequestContext, RequestHook};
use crate::http_client::{HttpClient, HttpRequest};
use crate::response::{normalize, CollectionResponse, FeedResponse};

/// Discrete query parameter pairs, never a pre-encoded string.
pub type QueryPairs = Vec<(String, String)>;

/// Singleton key for `read_by_id`: numeric keys are embedded unquoted,
/// string keys are wrapped in single quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    Number(i64),
    Text(String),
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(key) => write!(f, "{key}"),
            Self::Text(key) => write!(f, "'{key}'"),
        }
    }
}

impl From<i64> for ResourceKey {
    fn from(key: i64) -> Self {
        Self::Number(key)
    }
}

impl From<i32> for ResourceKey {
    fn from(key: i32) -> Self {
        Self::Number(i64::from(key))
    }
}

impl From<&str> for ResourceKey {
    fn from(key: &str) -> Self {
        Self::Text(key.to_owned())
    }
}

impl From<String> for ResourceKey {
    fn from(key: String) -> Self {
        Self::Text(key)
    }
}

/// Read-oriented feed client. Owns one admission queue and one credential
/// provider for its lifetime (wired into the hook pipeline at assembly);
/// nothing mutable is shared across distinct instances.
pub struct Feed {
    base_url: String,
    default_headers: BTreeMap<String, String>,
    hooks: Vec<Arc<dyn RequestHook>>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl Feed {
    pub fn builder() -> FeedBuilder {
        FeedBuilder::new()
    }

    pub(crate) fn new(
        base_url: String,
        default_headers: BTreeMap<String, String>,
        hooks: Vec<Arc<dyn RequestHook>>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            default_headers,
            hooks,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes one read against the feed.
    ///
    /// Pre-request hooks run in registration order (admission gate, then
    /// credential check/refresh/header injection), the GET is issued, and
    /// the payload is shape-detected and normalized. Transport failures are
    /// mapped to one categorized [`FeedError`] here and nowhere else; no
    /// automatic retry.
    pub async fn request(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<FeedResponse, FeedError> {
        let mut ctx = RequestContext::new(path, query.to_vec());
        ctx.headers = self.default_headers.clone();

        for hook in &self.hooks {
            hook.run(&mut ctx).await?;
        }

        tracing::debug!(path = %ctx.path, "issuing feed request");

        let mut request = HttpRequest::get(join_url(&self.base_url, &ctx.path));
        request.query = ctx.query;
        request.headers = ctx.headers;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(FeedError::from_transport)?;

        if !response.is_success() {
            return Err(FeedError::from_status(response.status, &response.body));
        }

        normalize(&response.body)
    }

    /// Reads a single entity by its singleton key, e.g.
    /// `read_by_id("/Property", 123)` requests `/Property(123)` and
    /// `read_by_id("/Property", "123")` requests `/Property('123')`.
    pub async fn read_by_id(
        &self,
        resource: &str,
        key: impl Into<ResourceKey>,
        query: &[(String, String)],
    ) -> Result<FeedResponse, FeedError> {
        let path = format!("{resource}({})", key.into());
        self.request(&path, query).await
    }

    /// Returns a pull-driven, finite page sequence over a collection
    /// resource. Each pull requests one page; server-issued next-links are
    /// split back into a path and freshly derived query pairs. No page is
    /// pre-fetched; dropping the stream is cancellation.
    pub fn read_by_query<'a>(&'a self, resource: &str, query: &[(String, String)]) -> PageStream<'a> {
        PageStream {
            feed: self,
            next: Some((resource.to_owned(), query.to_vec())),
        }
    }

    /// Fetches the `$metadata` document, returned verbatim and unparsed.
    pub async fn metadata(&self, query: &[(String, String)]) -> Result<String, FeedError> {
        match self.request("/$metadata", query).await? {
            FeedResponse::Raw(document) => Ok(document),
            FeedResponse::Entity(_) | FeedResponse::Collection(_) => Err(
                FeedError::UnexpectedPayload(String::from("metadata document was not raw text")),
            ),
        }
    }
}

/// Lazy page sequence produced by [`Feed::read_by_query`]. Not resumable
/// after an error page has been yielded.
pub struct PageStream<'a> {
    feed: &'a Feed,
    next: Option<(String, QueryPairs)>,
}

impl PageStream<'_> {
    /// Pulls the next page; `None` signals sequence end.
    pub async fn next_page(&mut self) -> Option<Result<CollectionResponse, FeedError>> {
        let (path, query) = self.next.take()?;

        let page = match self.feed.request(&path, &query).await {
            Ok(response) => match collection_page(response) {
                Ok(page) => page,
                Err(error) => return Some(Err(error)),
            },
            Err(error) => return Some(Err(error)),
        };

        if let Some(link) = &page.next_link {
            match split_next_link(&self.feed.base_url, link) {
                Ok(target) => self.next = Some(target),
                Err(error) => return Some(Err(error)),
            }
        }

        Some(Ok(page))
    }
}

/// Folds a normalized payload into a collection page. A single-entity body
/// becomes a one-element page so the sequence type stays uniform.
fn collection_page(response: FeedResponse) -> Result<CollectionResponse, FeedError> {
    match response {
        FeedResponse::Collection(page) => Ok(page),
        FeedResponse::Entity(entity) => Ok(CollectionResponse {
            context: entity.context,
            count: None,
            next_link: None,
            data: vec![serde_json::Value::Object(entity.data)],
        }),
        FeedResponse::Raw(_) => Err(FeedError::UnexpectedPayload(String::from(
            "query response was raw text, not a collection",
        ))),
    }
}

/// Splits an absolute or root-relative next-link into a base-relative path
/// plus freshly derived query pairs. The link's query is re-extracted, never
/// reused verbatim, and the base URL's own path prefix is stripped so the
/// result joins back onto the base without doubling it.
fn split_next_link(base_url: &str, link: &str) -> Result<(String, QueryPairs), FeedError> {
    let base = Url::parse(base_url).map_err(|_| FeedError::InvalidNextLink(link.to_owned()))?;

    let parsed = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .join(link)
            .map_err(|_| FeedError::InvalidNextLink(link.to_owned()))?,
        Err(_) => return Err(FeedError::InvalidNextLink(link.to_owned())),
    };

    let query = parsed
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let base_path = base.path().trim_end_matches('/');
    let link_path = parsed.path();
    let path = match link_path.strip_prefix(base_path) {
        Some(rest) if rest.is_empty() => String::from("/"),
        Some(rest) if rest.starts_with('/') => rest.to_owned(),
        // A link mounted outside the base path keeps its full path.
        _ => link_path.to_owned(),
    };

    Ok((path, query))
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}
