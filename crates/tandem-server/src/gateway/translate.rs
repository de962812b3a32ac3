//! HTTP ⇄ RPC translation helpers.
//!
//! Request side: the JSON body, the query string and the path parameters are
//! merged into one JSON object (path wins over query, query wins over body),
//! and selected headers become RPC metadata. Response side: the message is
//! rendered as JSON and response metadata becomes `grpc-metadata-*` headers.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use serde_json::{Map, Value};
use tandem_core::{RequestId, REQUEST_ID_HEADER};
use tandem_router::Params;
use tonic::metadata::{Ascii, KeyAndValueRef, MetadataKey, MetadataMap, MetadataValue};

use super::error::GatewayError;
use super::HttpResponse;

/// Prefix that marks a header as RPC metadata in both directions.
pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";

// Response metadata that describes the RPC transport rather than the call.
const RESERVED_METADATA: &[&str] = &[
    "content-type",
    "content-length",
    "date",
    "te",
    "trailer",
    "transfer-encoding",
    "user-agent",
];

/// Builds the JSON request message for a call.
pub(crate) fn merge_input(
    method: &Method,
    body: &[u8],
    query: Option<&str>,
    params: &Params,
) -> Result<Value, GatewayError> {
    let ignores_body = method == Method::GET || method == Method::DELETE || method == Method::HEAD;
    let mut input = if ignores_body || body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body)
            .map_err(|e| GatewayError::InvalidRequest(format!("malformed JSON body: {e}")))?
    };

    let query_pairs = query.map(parse_query).unwrap_or_default();
    if query_pairs.is_empty() && params.is_empty() {
        return Ok(input);
    }

    let Value::Object(object) = &mut input else {
        return Err(GatewayError::InvalidRequest(
            "request body must be a JSON object when the route binds parameters".to_string(),
        ));
    };

    for (name, value) in query_pairs {
        set_field(object, &name, value)?;
    }
    for (name, value) in params.iter() {
        set_field(object, name, value.to_string())?;
    }
    Ok(input)
}

/// Splits a query string into decoded `(name, value)` pairs.
pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Sets a string field, following `a.b.c` into nested objects.
fn set_field(object: &mut Map<String, Value>, path: &str, value: String) -> Result<(), GatewayError> {
    let mut segments = path.split('.').peekable();
    let mut current = object;

    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid field path '{path}'"
            )));
        }
        if segments.peek().is_none() {
            current.insert(segment.to_string(), Value::String(value));
            return Ok(());
        }
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match next {
            Value::Object(map) => map,
            _ => {
                return Err(GatewayError::InvalidRequest(format!(
                    "field '{segment}' in '{path}' is not an object"
                )))
            }
        };
    }
    Ok(())
}

/// Selects the request headers forwarded to the RPC as metadata.
pub(crate) fn forward_metadata(headers: &HeaderMap, request_id: &RequestId) -> MetadataMap {
    let mut metadata = MetadataMap::new();

    for (name, value) in headers {
        let key = if name == http::header::AUTHORIZATION {
            name.as_str()
        } else if let Some(key) = name.as_str().strip_prefix(METADATA_HEADER_PREFIX) {
            key
        } else {
            continue;
        };

        if key.ends_with("-bin") || key.is_empty() {
            tracing::debug!(header = %name, "binary or empty metadata header not forwarded");
            continue;
        }
        let Ok(key) = MetadataKey::<Ascii>::from_bytes(key.as_bytes()) else {
            continue;
        };
        let Some(value) = value
            .to_str()
            .ok()
            .and_then(|v| MetadataValue::<Ascii>::try_from(v).ok())
        else {
            continue;
        };
        metadata.append(key, value);
    }

    if let Ok(value) = MetadataValue::<Ascii>::try_from(request_id.to_string().as_str()) {
        metadata.insert(REQUEST_ID_HEADER, value);
    }
    metadata
}

/// Copies ASCII response metadata into `grpc-metadata-<key>` headers.
pub(crate) fn metadata_to_headers(metadata: &MetadataMap, headers: &mut HeaderMap) {
    for entry in metadata.iter() {
        let KeyAndValueRef::Ascii(key, value) = entry else {
            continue;
        };
        let key = key.as_str();
        if key.starts_with("grpc-") || RESERVED_METADATA.contains(&key) || key == REQUEST_ID_HEADER
        {
            continue;
        }
        let name = format!("{METADATA_HEADER_PREFIX}{key}");
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_encoded_bytes()),
        ) {
            headers.append(name, value);
        }
    }
}

/// A `200 application/json` response.
pub(crate) fn json_response(body: Vec<u8>, metadata: &MetadataMap, request_id: &RequestId) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    metadata_to_headers(metadata, headers);
    set_request_id(headers, request_id);
    response
}

pub(crate) fn set_request_id(headers: &mut HeaderMap, request_id: &RequestId) {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
}
