//! Okta Management API implementation of [`DirectoryClient`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use crate::client::DirectoryClient;
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{ErrorBody, GroupBody, GroupProfile, RemoteGroup, RemoteUser, UserRecord};

/// Upper bound on the pages followed by a single list call
pub const MAX_PAGES: usize = 500;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an Okta org.
#[derive(Clone)]
pub struct OktaConfig {
    /// Org URL, e.g. `https://example.okta.com`
    pub org_url: String,
    /// API token sent as `SSWS {token}`
    pub api_token: String,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl OktaConfig {
    /// Create a config with the default timeout
    pub fn new(org_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            org_url: org_url.into(),
            api_token: api_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> DirectoryResult<()> {
        let url = self.org_url.trim();
        if url.is_empty() {
            return Err(DirectoryError::Config("org URL is required".to_string()));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(DirectoryError::Config(format!(
                "org URL must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.api_token.trim().is_empty() {
            return Err(DirectoryError::Config("API token is required".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(DirectoryError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn base_url(&self) -> String {
        format!("{}/api/v1", self.org_url.trim().trim_end_matches('/'))
    }
}

impl fmt::Debug for OktaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OktaConfig")
            .field("org_url", &self.org_url)
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Okta Management API client.
pub struct OktaClient {
    http: reqwest::Client,
    base_url: String,
    auth: String,
}

impl fmt::Debug for OktaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OktaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OktaClient {
    /// Creates a client for the org described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the settings are invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &OktaConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("access-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DirectoryError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            auth: format!("SSWS {}", config.api_token.trim()),
        })
    }

    /// Base URL of the management API, `{org_url}/api/v1`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, &self.auth)
            .header(ACCEPT, "application/json")
    }

    /// Send a request and map non-success responses to `DirectoryError`.
    async fn send(&self, request: RequestBuilder, resource: &str) -> DirectoryResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        trace!(%status, resource, "directory response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body, resource))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> DirectoryResult<T> {
        let response = self.send(request, resource).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: &str,
    ) -> DirectoryResult<Vec<T>> {
        let mut items = Vec::new();
        let mut request = self.request(Method::GET, &self.url(path)).query(query);
        let mut pages = 0usize;

        loop {
            let response = self.send(request, resource).await?;
            let next = next_link(response.headers());
            let bytes = response.bytes().await?;
            let mut page: Vec<T> = serde_json::from_slice(&bytes)?;
            pages += 1;
            items.append(&mut page);

            let Some(url) = next else { break };
            let within_org = url
                .strip_prefix(self.base_url.as_str())
                .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'));
            if !within_org {
                return Err(DirectoryError::Pagination(format!(
                    "next link {url} is outside {}",
                    self.base_url
                )));
            }
            if pages >= MAX_PAGES {
                return Err(DirectoryError::Pagination(format!(
                    "{resource}: more than {MAX_PAGES} pages"
                )));
            }
            request = self.request(Method::GET, &url);
        }

        debug!(resource, pages, count = items.len(), "listed directory objects");
        Ok(items)
    }
}

/// Map a non-success response to a `DirectoryError`.
fn error_from_response(status: StatusCode, body: &str, resource: &str) -> DirectoryError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let summary = if parsed.error_summary.is_empty() {
        body.trim().to_string()
    } else {
        parsed.error_summary
    };

    match status {
        StatusCode::NOT_FOUND => DirectoryError::not_found(resource),
        StatusCode::BAD_REQUEST => DirectoryError::Validation { message: summary },
        StatusCode::CONFLICT => DirectoryError::Conflict { message: summary },
        _ => DirectoryError::Api {
            status: status.as_u16(),
            code: parsed.error_code,
            summary,
        },
    }
}

/// Extract the `rel="next"` target from RFC 8288 `Link` headers.
fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let mut parts = link.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|param| {
                let param = param.trim();
                param == "rel=\"next\"" || param == "rel=next"
            });
            if !is_next {
                return None;
            }
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(str::to_string)
        })
}

#[async_trait]
impl DirectoryClient for OktaClient {
    #[instrument(skip(self, profile), fields(name = %profile.name))]
    async fn create_group(&self, profile: &GroupProfile) -> DirectoryResult<RemoteGroup> {
        let request = self
            .request(Method::POST, &self.url("/groups"))
            .json(&GroupBody { profile });
        let group: RemoteGroup = self
            .send_json(request, &format!("group {}", profile.name))
            .await?;
        debug!(id = %group.id, "created group");
        Ok(group)
    }

    #[instrument(skip(self, profile), fields(name = %profile.name))]
    async fn update_group(&self, id: &str, profile: &GroupProfile) -> DirectoryResult<RemoteGroup> {
        let request = self
            .request(Method::PUT, &self.url(&format!("/groups/{id}")))
            .json(&GroupBody { profile });
        self.send_json(request, &format!("group {id}")).await
    }

    #[instrument(skip(self))]
    async fn get_group(&self, id: &str) -> DirectoryResult<RemoteGroup> {
        let request = self.request(Method::GET, &self.url(&format!("/groups/{id}")));
        self.send_json(request, &format!("group {id}")).await
    }

    #[instrument(skip(self))]
    async fn list_groups(&self, name_query: &str) -> DirectoryResult<Vec<RemoteGroup>> {
        self.get_all("/groups", &[("q", name_query)], "groups")
            .await
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, id: &str) -> DirectoryResult<()> {
        let request = self.request(Method::DELETE, &self.url(&format!("/groups/{id}")));
        match self.send(request, &format!("group {id}")).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("group already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn list_group_members(&self, group_id: &str) -> DirectoryResult<Vec<RemoteUser>> {
        let records: Vec<UserRecord> = self
            .get_all(
                &format!("/groups/{group_id}/users"),
                &[],
                &format!("group {group_id}"),
            )
            .await?;
        Ok(records.into_iter().map(RemoteUser::from).collect())
    }

    #[instrument(skip(self))]
    async fn add_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()> {
        let request = self.request(
            Method::PUT,
            &self.url(&format!("/groups/{group_id}/users/{user_id}")),
        );
        self.send(request, &format!("membership {group_id}/{user_id}"))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()> {
        let request = self.request(
            Method::DELETE,
            &self.url(&format!("/groups/{group_id}/users/{user_id}")),
        );
        self.send(request, &format!("membership {group_id}/{user_id}"))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> DirectoryResult<RemoteUser> {
        let filter = format!("profile.email eq \"{email}\"");
        let mut records: Vec<UserRecord> = self
            .get_all("/users", &[("filter", filter.as_str())], &format!("user {email}"))
            .await?;

        match records.len() {
            0 => Err(DirectoryError::not_found(format!("user {email}"))),
            1 => Ok(RemoteUser::from(records.remove(0))),
            matches => Err(DirectoryError::Ambiguous {
                email: email.to_string(),
                matches,
            }),
        }
    }
}
