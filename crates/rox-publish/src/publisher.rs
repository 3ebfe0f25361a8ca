//! Payload upload.

use crate::api::{ApiClient, ApiCredentials};
use crate::errors::PublishError;
use crate::transport::HttpTransport;
use rox_core::config::ServerConfig;
use rox_core::payload::MEDIA_TYPE_V1;
use tracing::{debug, info};

/// Relation chain from the API root to the payload collection.
pub const PAYLOAD_REL: &str = "v1:test-payloads";

/// Uploads a serialized payload to the server's discovered endpoint.
///
/// The endpoint is never hard-coded: it is resolved by following
/// [`PAYLOAD_REL`] from the server's API root. The server must answer
/// `202 Accepted`; any other status is an upload error carrying the
/// response body.
pub async fn upload(
    transport: &dyn HttpTransport,
    server: &ServerConfig,
    payload_json: &str,
) -> Result<(), PublishError> {
    let api_url = server
        .api_url
        .as_deref()
        .ok_or(PublishError::ServerNotConfigured)?;
    let credentials = ApiCredentials {
        key_id: server.api_key_id.clone().unwrap_or_default(),
        key_secret: server.api_key_secret.clone().unwrap_or_default(),
    };

    debug!(api_url, bytes = payload_json.len(), "uploading payload");
    let api = ApiClient::new(transport, credentials);
    let response = api
        .request(
            api_url,
            &[PAYLOAD_REL.to_string()],
            "POST",
            vec![
                ("Content-Type".to_string(), MEDIA_TYPE_V1.to_string()),
                (
                    "Content-Length".to_string(),
                    payload_json.len().to_string(),
                ),
            ],
            Some(payload_json.to_owned()),
        )
        .await?;

    if response.status != 202 {
        return Err(PublishError::UnexpectedStatus {
            status: response.status,
            body: response.body,
        });
    }

    info!("payload accepted by server");
    Ok(())
}
