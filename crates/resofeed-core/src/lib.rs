//! # Resofeed Core
//!
//! Read-oriented client for RESO Web API / OData-style real-estate feeds.
//!
//! ## Overview
//!
//! This crate provides the foundational components of the feed client:
//!
//! - **Feed client** with one `request` primitive and `read_by_id`,
//!   `read_by_query` (lazy pagination) and `$metadata` built on top of it
//! - **Payload normalization** for the three shapes providers return
//!   inconsistently: raw string, single entity, collection
//! - **Credential providers** for bearer and OAuth2 client-credentials
//!   strategies behind one polymorphic contract
//! - **Admission queue** serializing request issue rate to one in-flight
//!   task within an interval-capped window
//! - **Error taxonomy** mapping transport failures into categorized errors
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`admission`] | Interval-capped request admission queue |
//! | [`auth`] | Bearer and client-credentials providers |
//! | [`builder`] | Feed assembly and hook wiring |
//! | [`error`] | Feed error taxonomy |
//! | [`feed`] | Feed client and pagination |
//! | [`hooks`] | Pre-request middleware pipeline |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`provider`] | Per-provider admission tuning table |
//! | [`response`] | Payload shape detection and normalization |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resofeed_core::{AuthOptions, Feed, FeedResponse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = Feed::builder()
//!         .base_url("https://api.mlsgrid.com/v2")
//!         .auth(AuthOptions::Bearer {
//!             token: String::from("my-token"),
//!             token_type: None,
//!         })
//!         .build()?;
//!
//!     let mut pages = feed.read_by_query("/Property", &[]);
//!     while let Some(page) = pages.next_page().await {
//!         let page = page?;
//!         println!("fetched {} listings", page.data.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! A feed owns one admission queue and one credential provider for its
//! lifetime. Suspension points are strictly at I/O boundaries: the admission
//! gate, an optional credential refresh, and the transport call. Refresh is
//! exclusive with respect to this feed's own admissions via the queue's
//! pause/start bracket; see the [`auth`] module for the shared-provider
//! limitation.

pub mod admission;
pub mod auth;
pub mod builder;
pub mod error;
pub mod feed;
pub mod hooks;
pub mod http_client;
pub mod provider;
pub mod response;

pub use admission::{AdmissionConfig, AdmissionQueue};
pub use auth::{AuthOptions, CredentialProvider, Token};
pub use builder::{FeedBuilder, LimiterOptions};
pub use error::{AuthError, ErrorCode, ErrorDetail, FaultCode, FeedError};
pub use feed::{Feed, PageStream, QueryPairs, ResourceKey};
pub use hooks::{AdmissionHook, AuthHook, RequestContext, RequestHook};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use provider::KnownProvider;
pub use response::{CollectionResponse, EntityResponse, FeedResponse};
