mod cookies;
mod fingerprinting;
mod loader;
mod rewrite;
mod root;
mod telemetry;
mod timeout;
mod validator;

pub use cookies::CookieConfig;
pub use fingerprinting::{FingerprintConfig, FingerprintStrategy};
pub use loader::{load_from_path, load_from_str};
pub use rewrite::RewriteConfig;
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
pub use validator::validate;
