use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::models::UserIdentity;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("backend not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub trial_seconds_remaining: Option<i64>,
}

/// Backend calls made by the session controller.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn sync_user(&self, identity: &UserIdentity) -> Result<(), RemoteError>;
    async fn sync_usage(
        &self,
        uid: &str,
        daily_seconds_used: u64,
        date: NaiveDate,
    ) -> Result<(), RemoteError>;
    async fn get_entitlement(&self, uid: &str) -> Result<EntitlementResponse, RemoteError>;
    async fn checkout_url(&self, uid: &str) -> Result<String, RemoteError>;
    async fn portal_url(&self, uid: &str) -> Result<String, RemoteError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncUserRequest<'a> {
    uid: &'a str,
    email: &'a str,
    display_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncUsageRequest<'a> {
    uid: &'a str,
    daily_seconds_used: u64,
    date: String,
}

#[derive(Serialize)]
struct UidRequest<'a> {
    uid: &'a str,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

/// JSON-over-HTTPS backend. Without a base URL every call fails with
/// `NotConfigured`, which the callers treat like any other remote failure.
pub struct HttpBackend {
    base_url: Option<Url>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url
            .map(|raw| {
                let with_slash = if raw.ends_with('/') {
                    raw.to_string()
                } else {
                    format!("{raw}/")
                };
                Url::parse(&with_slash)
            })
            .transpose()?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        let base = self.base_url.as_ref().ok_or(RemoteError::NotConfigured)?;
        base.join(path)
            .map_err(|err| RemoteError::Network(format!("bad endpoint {path}: {err}")))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), RemoteError> {
        let response = self.client.post(self.endpoint(path)?).json(body).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn post_for<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.endpoint(path)?).json(body).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RemoteService for HttpBackend {
    async fn sync_user(&self, identity: &UserIdentity) -> Result<(), RemoteError> {
        let body = SyncUserRequest {
            uid: &identity.uid,
            email: &identity.email,
            display_name: &identity.display_name,
        };
        self.post("syncUser", &body).await
    }

    async fn sync_usage(
        &self,
        uid: &str,
        daily_seconds_used: u64,
        date: NaiveDate,
    ) -> Result<(), RemoteError> {
        let body = SyncUsageRequest {
            uid,
            daily_seconds_used,
            date: date.format("%Y-%m-%d").to_string(),
        };
        self.post("syncUsage", &body).await
    }

    async fn get_entitlement(&self, uid: &str) -> Result<EntitlementResponse, RemoteError> {
        let response = self
            .client
            .get(self.endpoint("getEntitlement")?)
            .query(&[("uid", uid)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        response
            .json::<EntitlementResponse>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }

    async fn checkout_url(&self, uid: &str) -> Result<String, RemoteError> {
        let response: UrlResponse = self
            .post_for("createCheckoutSession", &UidRequest { uid })
            .await?;
        Ok(response.url)
    }

    async fn portal_url(&self, uid: &str) -> Result<String, RemoteError> {
        let response: UrlResponse = self
            .post_for("createPortalSession", &UidRequest { uid })
            .await?;
        Ok(response.url)
    }
}

/// Fire-and-forget identity sync. Failures are logged only.
pub fn spawn_sync_user(remote: Arc<dyn RemoteService>, identity: UserIdentity) {
    tokio::spawn(async move {
        match remote.sync_user(&identity).await {
            Ok(()) => debug!("Synced user {}", identity.uid),
            Err(err) => warn!("User sync failed for {}: {err}", identity.uid),
        }
    });
}

/// Fire-and-forget usage sync. Failures are logged only.
pub fn spawn_sync_usage(
    remote: Arc<dyn RemoteService>,
    uid: String,
    daily_seconds_used: u64,
    date: NaiveDate,
) {
    tokio::spawn(async move {
        match remote.sync_usage(&uid, daily_seconds_used, date).await {
            Ok(()) => debug!("Synced usage for {uid}: {daily_seconds_used}s on {date}"),
            Err(err) => warn!("Usage sync failed for {uid}: {err}"),
        }
    });
}
