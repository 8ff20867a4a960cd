//! RFC 6265 cookie handling: parsing, scoping, and a session cookie jar.
//!
//! The crate is organized leaves-first: [`date`], [`domain`], [`path`] and
//! [`pubsuffix`] implement the protocol algebra; [`cookie`] is the typed
//! record plus the lenient `Set-Cookie` parser; [`store`] is the
//! persistence boundary with its in-memory reference implementation; and
//! [`cookie_jar`] is the §5.3/§5.4 state machine on top.
//!
//! ```no_run
//! use crumble::{CookieJar, GetCookieOptions, SetCookieOptions};
//! use url::Url;
//!
//! let jar = CookieJar::new();
//! let url = Url::parse("https://example.com/login").unwrap();
//! jar.set_cookie("sid=abc123; HttpOnly; Secure", &url, &SetCookieOptions::default())
//!     .unwrap();
//!
//! let header = jar.get_cookie_string(&url, &GetCookieOptions::default()).unwrap();
//! assert_eq!(header, "sid=abc123");
//! ```

pub mod cookie;
pub mod cookie_jar;
pub mod date;
pub mod domain;
pub mod errors;
pub mod path;
pub mod pubsuffix;
pub mod store;

pub use cookie::{
    cookie_compare, parse_cookie_header, Cookie, Expires, ExpiryTime, MaxAge, SerializedCookie,
    MAX_DATE, SERIALIZABLE_PROPERTIES,
};
pub use cookie_jar::{
    CookieJar, GetCookieOptions, JarOptions, SerializedJar, SetCookieOptions,
};
pub use errors::{Error, ParseError};
pub use store::{CookieStore, CookieStoreHandle, MemoryCookieStore, StoreError};
