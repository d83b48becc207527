pub mod client;
pub mod http;
pub mod normalize;
pub mod wire;

pub use client::{SyncClient, SyncError, SyncReply, SyncRequest, send};
pub use http::HttpClient;
