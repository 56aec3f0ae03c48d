//! HTTP client for the platform's REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{StratusError, StratusResult};
use crate::types::{BuildManifest, ResourceKind, Visibility};

use super::ServerlessApi;
use super::types::{
    ApiErrorBody, BuildResource, DeploymentResource, EnvironmentResource, RemoteResource,
    ServiceResource, UploadTarget, VariableResource, VersionResource,
};

pub const DEFAULT_BASE_URL: &str = "https://serverless.twilio.com/v1";

/// Region used when only an edge location is requested.
const DEFAULT_REGION: &str = "us1";

const SSE_HEADER: &str = "x-amz-server-side-encryption";
const SSE_KEY_HEADER: &str = "x-amz-server-side-encryption-aws-kms-key-id";

/// Connection settings for [`HttpApi`]. Immutable once the client is built.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub base_url: String,
    /// Limit for each control-plane request.
    pub timeout: Duration,
    /// Limit for each content upload. `None` lets transfers run to completion.
    pub upload_timeout: Option<Duration>,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            upload_timeout: None,
            user_agent: format!("stratus/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Route requests through a regional host, e.g. `serverless.sydney.au1.twilio.com`.
    pub fn with_region(mut self, region: Option<&str>, edge: Option<&str>) -> StratusResult<Self> {
        if region.is_none() && edge.is_none() {
            return Ok(self);
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StratusError::configuration(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| StratusError::configuration("base URL has no host"))?;
        let host = regional_host(host, region, edge);
        url.set_host(Some(&host))
            .map_err(|e| StratusError::configuration(format!("invalid host {}: {}", host, e)))?;
        self.base_url = url.to_string();
        Ok(self)
    }

    /// Check credentials before any request is made.
    pub fn validate(&self) -> StratusResult<()> {
        if self.account_sid.is_empty() {
            return Err(StratusError::configuration("missing account SID"));
        }
        if self.account_sid.len() != 34 || !self.account_sid.starts_with("AC") {
            return Err(StratusError::configuration(format!(
                "invalid account SID \"{}\": expected 34 characters starting with AC",
                self.account_sid
            )));
        }
        if self.auth_token.is_empty() {
            return Err(StratusError::configuration("missing auth token"));
        }
        Ok(())
    }
}

fn regional_host(host: &str, region: Option<&str>, edge: Option<&str>) -> String {
    let (product, domain) = host.split_once('.').unwrap_or((host, ""));
    let region = match (region, edge) {
        (Some(region), _) => Some(region),
        (None, Some(_)) => Some(DEFAULT_REGION),
        (None, None) => None,
    };
    [Some(product), edge, region, Some(domain)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// [`ServerlessApi`] over HTTPS with basic auth and form-encoded bodies.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    timeout: Duration,
    upload_timeout: Option<Duration>,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> StratusResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            timeout: config.timeout,
            upload_timeout: config.upload_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Control-plane request: authenticated and bounded by the request timeout.
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .timeout(self.timeout)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> StratusResult<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.authed(self.client.get(&url)).send().await?;
        read_json(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> StratusResult<T> {
        let url = self.url(path);
        debug!(%url, fields = form.len(), "POST");
        let response = self
            .authed(self.client.post(&url))
            .form(form)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete(&self, path: &str) -> StratusResult<()> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        let response = self.authed(self.client.delete(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint.
    async fn list<T: DeserializeOwned>(&self, path: &str, key: &str) -> StratusResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next.take() {
            debug!(%url, "GET page");
            let response = self.authed(self.client.get(&url)).send().await?;
            let mut page: Value = read_json(response).await?;

            let entries = page.get_mut(key).map(Value::take).unwrap_or(Value::Null);
            if !entries.is_null() {
                let mut batch: Vec<T> = serde_json::from_value(entries)?;
                items.append(&mut batch);
            }

            next = page
                .get("meta")
                .and_then(|meta| meta.get("next_page_url"))
                .and_then(Value::as_str)
                .map(str::to_owned);
        }

        Ok(items)
    }
}

async fn check_status(response: Response) -> StratusResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> StratusResult<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

fn api_error(status: StatusCode, body: &str) -> StratusError {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            trimmed.to_string()
        }
    };

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => StratusError::Api {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed.message.unwrap_or_else(fallback),
            more_info: parsed.more_info,
        },
        Err(_) => StratusError::api(status.as_u16(), fallback()),
    }
}

#[async_trait]
impl ServerlessApi for HttpApi {
    async fn list_services(&self) -> StratusResult<Vec<ServiceResource>> {
        self.list("/Services", "services").await
    }

    async fn create_service(&self, unique_name: &str) -> StratusResult<ServiceResource> {
        let form = [
            ("UniqueName", unique_name.to_string()),
            ("FriendlyName", unique_name.to_string()),
            ("IncludeCredentials", "true".to_string()),
        ];
        self.post("/Services", &form).await
    }

    async fn list_environments(
        &self,
        service_sid: &str,
    ) -> StratusResult<Vec<EnvironmentResource>> {
        self.list(&format!("/Services/{}/Environments", service_sid), "environments")
            .await
    }

    async fn create_environment(
        &self,
        service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> StratusResult<EnvironmentResource> {
        let mut form = vec![("UniqueName", unique_name.to_string())];
        if !domain_suffix.is_empty() {
            form.push(("DomainSuffix", domain_suffix.to_string()));
        }
        self.post(&format!("/Services/{}/Environments", service_sid), &form)
            .await
    }

    async fn list_resources(
        &self,
        service_sid: &str,
        kind: ResourceKind,
    ) -> StratusResult<Vec<RemoteResource>> {
        self.list(
            &format!("/Services/{}/{}", service_sid, kind.collection()),
            kind.list_key(),
        )
        .await
    }

    async fn create_resource(
        &self,
        service_sid: &str,
        kind: ResourceKind,
        friendly_name: &str,
    ) -> StratusResult<RemoteResource> {
        let form = [("FriendlyName", friendly_name.to_string())];
        self.post(
            &format!("/Services/{}/{}", service_sid, kind.collection()),
            &form,
        )
        .await
    }

    async fn create_version(
        &self,
        service_sid: &str,
        kind: ResourceKind,
        resource_sid: &str,
        path: &str,
        visibility: Visibility,
    ) -> StratusResult<VersionResource> {
        let form = [
            ("Path", path.to_string()),
            ("Visibility", visibility.as_str().to_string()),
        ];
        self.post(
            &format!(
                "/Services/{}/{}/{}/Versions",
                service_sid,
                kind.collection(),
                resource_sid
            ),
            &form,
        )
        .await
    }

    async fn upload_content(&self, target: &UploadTarget, content: Vec<u8>) -> StratusResult<()> {
        debug!(bytes = content.len(), "PUT pre-signed upload");
        let mut request = self
            .client
            .put(&target.url)
            .header(SSE_HEADER, "aws:kms")
            .header(SSE_KEY_HEADER, &target.kms_arn)
            .body(content);
        if let Some(limit) = self.upload_timeout {
            request = request.timeout(limit);
        }
        let response = request.send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn create_build(
        &self,
        service_sid: &str,
        manifest: &BuildManifest,
    ) -> StratusResult<BuildResource> {
        let form = manifest.to_form()?;
        self.post(&format!("/Services/{}/Builds", service_sid), &form)
            .await
    }

    async fn get_build(&self, service_sid: &str, build_sid: &str) -> StratusResult<BuildResource> {
        self.get(&format!("/Services/{}/Builds/{}", service_sid, build_sid))
            .await
    }

    async fn list_builds(&self, service_sid: &str) -> StratusResult<Vec<BuildResource>> {
        self.list(&format!("/Services/{}/Builds", service_sid), "builds")
            .await
    }

    async fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> StratusResult<DeploymentResource> {
        let form = [("BuildSid", build_sid.to_string())];
        self.post(
            &format!(
                "/Services/{}/Environments/{}/Deployments",
                service_sid, environment_sid
            ),
            &form,
        )
        .await
    }

    async fn list_variables(
        &self,
        service_sid: &str,
        environment_sid: &str,
    ) -> StratusResult<Vec<VariableResource>> {
        self.list(
            &format!(
                "/Services/{}/Environments/{}/Variables",
                service_sid, environment_sid
            ),
            "variables",
        )
        .await
    }

    async fn create_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        key: &str,
        value: &str,
    ) -> StratusResult<VariableResource> {
        let form = [("Key", key.to_string()), ("Value", value.to_string())];
        self.post(
            &format!(
                "/Services/{}/Environments/{}/Variables",
                service_sid, environment_sid
            ),
            &form,
        )
        .await
    }

    async fn update_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
        value: &str,
    ) -> StratusResult<VariableResource> {
        let form = [("Value", value.to_string())];
        self.post(
            &format!(
                "/Services/{}/Environments/{}/Variables/{}",
                service_sid, environment_sid, variable_sid
            ),
            &form,
        )
        .await
    }

    async fn delete_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
    ) -> StratusResult<()> {
        self.delete(&format!(
            "/Services/{}/Environments/{}/Variables/{}",
            service_sid, environment_sid, variable_sid
        ))
        .await
    }
}
