#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod policy;
pub mod proxy;
pub mod rewrite;
pub mod script;
pub mod telemetry;
pub mod translate;

pub use config::{load_from_path, load_from_str, Config};
pub use error::{ProxyError, Result};
pub use policy::{CookieStore, CookieTable, FingerprintSource, PolicyEngine};
pub use proxy::{run, serve, HttpError, ProxyState};
pub use rewrite::{ContentKind, RewritePipeline};
pub use translate::{to_original, to_proxied, ProxyReference, RewriteContext};
