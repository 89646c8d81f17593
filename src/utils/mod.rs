//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use self::http::{HttpTransport, RawResponse, Transport};
pub use self::url::Endpoints;
