//! Payload shape detection and normalization.
//!
//! Upstream providers return three shapes inconsistently: a plain string
//! (the `$metadata` document), a single entity object, or a collection
//! marked by a `value` array. Protocol metadata keys are hoisted to the
//! top level of the normalized response and never appear inside `data`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FeedError;

pub const METADATA_CONTEXT: &str = "@odata.context";
pub const METADATA_NEXT_LINK: &str = "@odata.nextLink";
pub const METADATA_COUNT: &str = "@odata.count";

/// Single entity with hoisted context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub data: Map<String, Value>,
}

/// One page of a collection with hoisted protocol metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
    pub data: Vec<Value>,
}

/// Normalized feed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedResponse {
    /// Unparsed body, returned verbatim (e.g. the metadata document).
    Raw(String),
    Entity(EntityResponse),
    Collection(CollectionResponse),
}

/// Normalizes a successful response body.
///
/// An empty or JSON-null body fails with [`FeedError::EmptyResponse`];
/// empty success is never silently returned. Text that does not parse as
/// JSON is returned verbatim as [`FeedResponse::Raw`].
pub fn normalize(body: &str) -> Result<FeedResponse, FeedError> {
    if body.trim().is_empty() {
        return Err(FeedError::EmptyResponse);
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(FeedResponse::Raw(body.to_owned()));
    };

    match value {
        Value::Null => Err(FeedError::EmptyResponse),
        Value::String(text) => Ok(FeedResponse::Raw(text)),
        Value::Object(map) => Ok(normalize_object(map)),
        // Arrays and scalars are not protocol shapes; hand back the text.
        _ => Ok(FeedResponse::Raw(body.to_owned())),
    }
}

/// Detection rule: a body containing a `value` array is a collection; the
/// remaining fields, after stripping protocol metadata keys, form one entity.
fn normalize_object(mut map: Map<String, Value>) -> FeedResponse {
    let context = take_string(&mut map, METADATA_CONTEXT);
    let next_link = take_string(&mut map, METADATA_NEXT_LINK);
    let count = take_count(&mut map);

    match map.remove("value") {
        Some(Value::Array(data)) => FeedResponse::Collection(CollectionResponse {
            context,
            count,
            next_link,
            data,
        }),
        Some(other) => {
            // A non-array `value` field is ordinary entity data.
            map.insert(String::from("value"), other);
            FeedResponse::Entity(EntityResponse { context, data: map })
        }
        None => FeedResponse::Entity(EntityResponse { context, data: map }),
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

/// `@odata.count` arrives as a number or a numeric string depending on the
/// provider.
fn take_count(map: &mut Map<String, Value>) -> Option<u64> {
    match map.remove(METADATA_COUNT) {
        Some(Value::Number(count)) => count.as_u64(),
        Some(Value::String(count)) => count.parse().ok(),
        _ => None,
    }
}
