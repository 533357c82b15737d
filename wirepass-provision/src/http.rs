//! HTTP implementation of the provisioning client.
//!
//! Speaks the wg-easy style JSON API: password login at `POST /session`
//! yielding a session cookie, client CRUD under `wireguard/client/`. The
//! session cookie lives in the reqwest cookie store owned by this instance,
//! not in any process-wide state. A 401 on any call triggers one login and
//! one replay; a second 401 is a hard auth failure.

use crate::error::{ProvisionError, ProvisionResult};
use crate::Provisioner;
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use wirepass_types::ProfileRef;

/// Configuration for [`HttpProvisioner`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `http://10.0.0.1:51821/api`.
    pub base_url: String,
    /// Password for the session login exchange.
    pub password: String,
    /// Per-request timeout in seconds. A hung call must not stall the
    /// reconciler indefinitely.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:51821/api".to_string(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientEntry {
    id: String,
    name: String,
}

/// Production provisioning client.
pub struct HttpProvisioner {
    config: HttpConfig,
    client: Client,
}

impl HttpProvisioner {
    /// Creates a new client. The cookie store holds the session across calls.
    pub fn new(config: HttpConfig) -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Performs the password login exchange. The server sets the session
    /// cookie on success.
    async fn login(&self) -> ProvisionResult<()> {
        let resp = self
            .client
            .post(self.url("session"))
            .json(&json!({ "password": self.config.password }))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!("provisioning session established");
            Ok(())
        } else if status.is_server_error() {
            Err(ProvisionError::Unavailable(format!(
                "login returned {status}"
            )))
        } else {
            Err(ProvisionError::AuthFailed(format!(
                "login rejected with {status}"
            )))
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> ProvisionResult<Response> {
        let mut req = self.client.request(method.clone(), url);
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    /// Sends a request, re-authenticating and replaying exactly once on 401.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ProvisionResult<Response> {
        let url = self.url(path);
        let resp = self.send_once(&method, &url, body.as_ref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(resp);
        }

        debug!("session expired, re-authenticating");
        self.login().await?;
        let resp = self.send_once(&method, &url, body.as_ref()).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(ProvisionError::AuthFailed(
                "request rejected after fresh login".to_string(),
            ));
        }
        check_status(resp)
    }

    /// Looks up a profile by its label in the client list.
    async fn find_by_label(&self, label: &str) -> ProvisionResult<Option<ProfileRef>> {
        let resp = self
            .request(Method::GET, "wireguard/client/", None)
            .await?;
        let clients: Vec<ClientEntry> = resp
            .json()
            .await
            .map_err(|e| ProvisionError::Api(format!("invalid client list: {e}")))?;
        Ok(clients
            .into_iter()
            .find(|c| c.name == label)
            .map(|c| ProfileRef::new(c.id)))
    }
}

fn check_status(resp: Response) -> ProvisionResult<Response> {
    let status = resp.status();
    if status.is_server_error() {
        Err(ProvisionError::Unavailable(format!("API returned {status}")))
    } else if !status.is_success() {
        Err(ProvisionError::Api(format!("API returned {status}")))
    } else {
        Ok(resp)
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn create_profile(&self, label: &str) -> ProvisionResult<ProfileRef> {
        // Find-or-create: a retry after a partial failure must reuse the
        // profile a previous attempt already created.
        if let Some(existing) = self.find_by_label(label).await? {
            debug!(label, "reusing existing profile {existing}");
            return Ok(existing);
        }

        self.request(
            Method::POST,
            "wireguard/client/",
            Some(json!({ "name": label })),
        )
        .await?;

        // The create endpoint does not return the id; resolve it from the
        // list by label.
        let profile = self
            .find_by_label(label)
            .await?
            .ok_or_else(|| ProvisionError::ProfileNotFound(label.to_string()))?;
        info!(label, "created profile {profile}");
        Ok(profile)
    }

    async fn fetch_configuration(&self, profile: &ProfileRef) -> ProvisionResult<Vec<u8>> {
        let resp = self
            .request(
                Method::GET,
                &format!("wireguard/client/{profile}/configuration"),
                None,
            )
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn disable_profile(&self, profile: &ProfileRef) -> ProvisionResult<()> {
        self.request(
            Method::POST,
            &format!("wireguard/client/{profile}/disable"),
            None,
        )
        .await?;
        debug!("disabled profile {profile}");
        Ok(())
    }
}
