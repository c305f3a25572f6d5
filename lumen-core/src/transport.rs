use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lumen_types::{LumenError, TransportError, is_retryable_status};

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read.
    #[default]
    Get,
    /// Headers-only read.
    Head,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
}

impl Method {
    /// Canonical upper-case verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Only plain reads are eligible for response caching.
    #[must_use]
    pub const fn is_cacheable_read(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header pairs, forwarded verbatim.
    pub headers: Vec<(String, String)>,
    /// Body bytes, forwarded verbatim.
    pub body: Option<Vec<u8>>,
}

/// A response whose body has been read completely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Value of the `content-type` header, if present.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a JSON response.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    /// Build a plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: body.into().into_bytes(),
        }
    }

    /// Status is in `200..300`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 429 or any 5xx.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        is_retryable_status(self.status)
    }

    /// Whether the declared content type is JSON (`application/json` or a `+json` suffix).
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            let essence = ct.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
        })
    }

    /// Best-effort JSON view of the body, used for error documents.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        if self.is_json() {
            serde_json::from_slice(&self.body).ok()
        } else {
            None
        }
    }
}

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// The response declared JSON.
    Json(serde_json::Value),
    /// Anything else, as (lossy) UTF-8 text.
    Text(String),
}

impl Payload {
    /// Decode a response body according to its content type.
    ///
    /// # Errors
    /// Returns `LumenError::Decode` if the response declared JSON but the body does not parse.
    pub fn from_response(response: &HttpResponse) -> Result<Self, LumenError> {
        if response.is_json() {
            serde_json::from_slice(&response.body)
                .map(Self::Json)
                .map_err(|e| LumenError::Decode(e.to_string()))
        } else {
            Ok(Self::Text(String::from_utf8_lossy(&response.body).into_owned()))
        }
    }

    /// Borrow the JSON value, if this is a JSON payload.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Deserialize the payload into `T`.
    ///
    /// Text payloads are parsed as JSON as a fallback for services that omit the header.
    ///
    /// # Errors
    /// Returns `LumenError::Data` when the payload does not match `T`.
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> Result<T, LumenError> {
        match self {
            Self::Json(v) => serde_json::from_value(v).map_err(|e| LumenError::data(e.to_string())),
            Self::Text(s) => serde_json::from_str(&s).map_err(|e| LumenError::data(e.to_string())),
        }
    }
}

/// The network seam used by the request executor.
///
/// Implementations perform exactly one exchange per call and read the whole
/// body. Dropping the returned future must abort the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &'static str;

    /// Perform one exchange.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_detected_with_parameters() {
        let r = HttpResponse {
            status: 200,
            content_type: Some("Application/JSON; charset=utf-8".into()),
            body: b"[1,2]".to_vec(),
        };
        assert!(r.is_json());
        assert_eq!(
            Payload::from_response(&r).unwrap(),
            Payload::Json(serde_json::json!([1, 2]))
        );
    }

    #[test]
    fn vendor_json_suffix_counts_as_json() {
        let r = HttpResponse {
            status: 200,
            content_type: Some("application/problem+json".into()),
            body: br#"{"error":"x"}"#.to_vec(),
        };
        assert!(r.is_json());
    }

    #[test]
    fn missing_content_type_decodes_as_text() {
        let r = HttpResponse {
            status: 200,
            content_type: None,
            body: b"[1,2]".to_vec(),
        };
        assert_eq!(
            Payload::from_response(&r).unwrap(),
            Payload::Text("[1,2]".into())
        );
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let r = HttpResponse {
            status: 200,
            content_type: Some("application/json".into()),
            body: b"{not json".to_vec(),
        };
        assert!(matches!(
            Payload::from_response(&r),
            Err(LumenError::Decode(_))
        ));
    }

    #[test]
    fn status_classes() {
        assert!(HttpResponse::text(204, "").is_success());
        assert!(!HttpResponse::text(304, "").is_success());
        assert!(HttpResponse::text(429, "").is_retryable());
        assert!(HttpResponse::text(502, "").is_retryable());
        assert!(!HttpResponse::text(404, "").is_retryable());
    }

    #[test]
    fn only_get_is_cacheable() {
        assert!(Method::Get.is_cacheable_read());
        assert!(!Method::Head.is_cacheable_read());
        assert!(!Method::Post.is_cacheable_read());
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
