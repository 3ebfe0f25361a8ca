pub mod api;
pub mod client;
pub mod errors;
pub mod publisher;
pub mod transport;
pub mod uid;

pub use api::{ApiClient, ApiCredentials};
pub use client::{Client, ProcessOutcome};
pub use errors::{ApiError, PublishError};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
