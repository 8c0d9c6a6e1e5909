//! Wire-level helpers: URLs, headers and payload encoding.
//!
//! Everything in this module is synchronous and free of I/O, so it can be
//! tested and reused without a transport.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`resolve_url`] / [`build_query`] | Base URL joining and query serialization |
//! | [`Headers`] / [`parse_headers`] | Case-insensitive header map and raw header parsing |
//! | [`transform_request`] | Body serialization and `Content-Type` negotiation |

pub mod constants;
mod headers;
mod payload;
mod url;

pub use headers::{parse_headers, HeaderValue, Headers};
pub use payload::{stringify_safely, transform_request, BinaryView, Payload};
pub use url::{
    build_query, is_absolute_url, parse_protocol, resolve_url, serialize_params, ParamValue, Params,
};
