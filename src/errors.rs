use crate::store::StoreError;

/// Errors surfaced by jar operations.
///
/// Policy rejections (`PublicSuffix`, `DomainMismatch`, `HttpOnlyMismatch`)
/// abort the current operation. Store errors are never swallowed, not even
/// when parse errors are being ignored.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Cookie has domain set to a public suffix")]
    PublicSuffix,

    #[error("Cookie not in this host's domain")]
    DomainMismatch,

    #[error("Cookie is HttpOnly and this isn't an HTTP API")]
    HttpOnlyMismatch,

    #[error("request URL has no usable host")]
    InvalidUrl,

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(StoreError),
}

/// Errors produced while parsing a `Set-Cookie` string or a serialized
/// cookie. Distinct from "no cookie": an accepted-but-empty result is not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("cookie string is empty")]
    Empty,

    #[error("cookie pair has no name")]
    MissingKey,

    #[error("control character in cookie name or value")]
    ControlCharacter,

    #[error("malformed serialized cookie")]
    InvalidJson,
}
