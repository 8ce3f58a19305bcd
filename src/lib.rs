//! # numlookup-rs
//!
//! Client for a third-party number-lookup service that hides its data
//! behind a JavaScript cookie challenge and returns results as labeled
//! HTML row fragments.
//!
//! A lookup is one self-contained exchange: POST the subject with a fixed
//! browser fingerprint, and if the service answers with its verification
//! page instead of data, decrypt the embedded hex triple and retry once
//! with the solved token riding the cookie header. Successful replies are
//! normalized into ordered key/value records.
//!
//! ## Features
//!
//! - Async reqwest transport behind a swappable trait
//! - Native AES-CBC challenge solving, no JavaScript engine required
//! - Structured fragment extraction with aggressive text sanitization
//! - Typed failures distinguishing transport, challenge, and shape errors
//!
//! ## Example
//!
//! ```no_run
//! use numlookup_rs::{LookupClient, LookupConfig};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Url::parse("https://example.com/uploads/abc/web.php?i=1")?;
//!     let client = LookupClient::new(LookupConfig::new(endpoint))?;
//!     let records = client.lookup("9876543210", None).await?;
//!     for record in &records {
//!         for (key, value) in record.iter() {
//!             println!("{key}: {value}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod lookup;

pub mod challenges;
pub mod config;
pub mod extract;
pub mod upstream;

pub use crate::lookup::{LookupClient, LookupClientBuilder, LookupError, LookupResult};

pub use crate::challenges::classify::{Classification, classify};
pub use crate::challenges::solver::{ChallengeSolver, ResolvedToken, SolverError};

pub use crate::config::{
    DEFAULT_COOKIE_NAME, DEFAULT_FORM_FIELD, DEFAULT_TIMEOUT, FINGERPRINT_HEADERS, LookupConfig,
    origin_from_url,
};

pub use crate::extract::{FieldRecord, ResultSet, clean_text, extract_fields, normalize_key};

pub use crate::upstream::{
    DispatchError, LookupRequest, ReqwestDispatcher, UpstreamResponse, UpstreamTransport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
