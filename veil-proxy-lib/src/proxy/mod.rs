pub mod client;
pub mod connection;
pub mod context;
pub mod decompress;
pub mod forwarding;
pub mod http_result;
pub mod router;
pub mod server;
pub mod synthetic_response;
pub mod transcode;

pub use client::{build_upstream_client, UpstreamClient};
pub use context::ProxyState;
pub use http_result::HttpError;
pub use router::handle_request;
pub use server::{run, serve};
pub use transcode::{choose_disposition, Disposition, TranscodeState, Transcoder};
