//! Header names, media types and scheme lists used across the pipeline.

/// Canonical `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Canonical `Accept` header name.
pub const ACCEPT: &str = "Accept";

/// `Accept` value applied when the caller sets none.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// JSON media type.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type for URL-encoded form payloads.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded;charset=utf-8";

/// Response header that accumulates into a list instead of being joined.
pub const SET_COOKIE: &str = "set-cookie";

/// Response headers whose duplicates are dropped, keeping the first value.
pub const IGNORE_DUPLICATES: &[&str] = &[
    "age",
    "authorization",
    "content-length",
    "content-type",
    "etag",
    "expires",
    "from",
    "host",
    "if-modified-since",
    "if-unmodified-since",
    "last-modified",
    "location",
    "max-forwards",
    "proxy-authorization",
    "referer",
    "retry-after",
    "user-agent",
];

/// Schemes the transport adapter accepts.
pub const SUPPORTED_PROTOCOLS: &[&str] = &["http", "https", "file", "blob"];
