//! Hypermedia link resolution.
//!
//! Instead of hard-coding resource URLs, the server's API is entered at its
//! root and navigated by link relation: each hop GETs a `hal+json` resource
//! and follows `_links[rel].href`. Hops are strictly sequential; a failed
//! chain restarts from the root on the next call.

use crate::errors::ApiError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use tracing::debug;

pub const HAL_MEDIA_TYPE: &str = "application/hal+json";

/// API key credentials for the `RoxApiKey` authorization scheme.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl ApiCredentials {
    pub fn authorization_header(&self) -> String {
        format!(
            "RoxApiKey id=\"{}\" secret=\"{}\"",
            self.key_id, self.key_secret
        )
    }
}

/// Relation-chasing client over an injected transport.
pub struct ApiClient<'a> {
    transport: &'a dyn HttpTransport,
    credentials: ApiCredentials,
}

impl<'a> ApiClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, credentials: ApiCredentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// Walks `rels` starting at `root_url` and returns the final resource
    /// URL. Every hop is an authenticated GET expecting a 200 `hal+json`
    /// response.
    pub async fn resolve(&self, root_url: &str, rels: &[String]) -> Result<String, ApiError> {
        if rels.is_empty() {
            return Err(ApiError::EmptyRelationChain);
        }
        let mut url = root_url.to_owned();
        for rel in rels {
            url = self.follow(&url, rel).await?;
        }
        Ok(url)
    }

    async fn follow(&self, url: &str, rel: &str) -> Result<String, ApiError> {
        debug!(url, rel, "following link relation");
        let response = self
            .transport
            .send(HttpRequest {
                url: url.to_owned(),
                method: "GET".to_string(),
                headers: vec![
                    ("Accept".to_string(), HAL_MEDIA_TYPE.to_string()),
                    (
                        "Authorization".to_string(),
                        self.credentials.authorization_header(),
                    ),
                ],
                body: None,
            })
            .await?;

        if response.status != 200 {
            return Err(ApiError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        let body: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidJson {
                message: e.to_string(),
                body: response.body.clone(),
            })?;
        let links = body
            .get("_links")
            .and_then(|links| links.as_object())
            .ok_or_else(|| ApiError::MissingLinks {
                body: response.body.clone(),
            })?;
        let link = links.get(rel).ok_or_else(|| ApiError::MissingRelation {
            rel: rel.to_owned(),
            links: serde_json::Value::Object(links.clone()).to_string(),
        })?;
        let href = link
            .get("href")
            .and_then(|href| href.as_str())
            .ok_or_else(|| ApiError::MissingHref {
                rel: rel.to_owned(),
                link: link.to_string(),
            })?;
        Ok(href.to_owned())
    }

    /// Resolves the relation chain, then issues the caller's request against
    /// the final URL with the authorization header applied. The response is
    /// returned as-is; interpreting its status is the caller's business.
    pub async fn request(
        &self,
        root_url: &str,
        rels: &[String],
        method: &str,
        mut headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.resolve(root_url, rels).await?;
        headers.push((
            "Authorization".to_string(),
            self.credentials.authorization_header(),
        ));
        Ok(self
            .transport
            .send(HttpRequest {
                url,
                method: method.to_string(),
                headers,
                body,
            })
            .await?)
    }
}
