//! OneFS HTTP Transport
//!
//! Implements [`RemoteStorageApi`] on top of reqwest. Platform API requests
//! go to `/platform/<version>/...`, where the version comes from the active
//! binding; file system requests go to `/namespace/<path>`. Authentication
//! is HTTP basic auth on every request.

use crate::domain::model::*;
use crate::domain::ports::{RemoteResult, RemoteStorageApi};
use crate::error::{Error, Result};
use crate::onefs::binding::ApiBinding;
use crate::onefs::classify::RemoteError;
use crate::onefs::client::ClientConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::error::Error as _;
use tracing::trace;

/// Platform API version of the only auth cache endpoint before OneFS 8.0.1
const LEGACY_AUTH_CACHE_VERSION: u8 = 3;

/// reqwest-backed OneFS transport
pub struct HttpApi {
    http: reqwest::Client,
    host: Url,
    username: String,
    password: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::Configuration(format!("Cannot build the HTTP client: {}", e)))?;

        let host = Url::parse(&format!("https://localhost:{}", config.port))
            .map_err(|e| Error::Configuration(format!("Invalid OneFS URL: {}", e)))?;

        Ok(Self {
            http,
            host,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    // =========================================================================
    // URLs
    // =========================================================================

    fn url(&self, path: &str) -> RemoteResult<Url> {
        self.host
            .join(path)
            .map_err(|e| RemoteError::connection(format!("Invalid request URL {}: {}", path, e)))
    }

    fn platform_url(&self, version: u8, resource: &str) -> RemoteResult<Url> {
        self.url(&format!("platform/{}/{}", version, resource))
    }

    fn namespace_url(&self, path: &str) -> RemoteResult<Url> {
        self.url(&format!("namespace/{}", encode_path(path)))
    }

    fn acl_url(&self, path: &str) -> RemoteResult<Url> {
        let mut url = self.namespace_url(path)?;
        url.set_query(Some("acl"));
        Ok(url)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        trace!(%method, %url, "OneFS request");
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.ok().filter(|body| !body.is_empty());
        Err(RemoteError::Api {
            status: status.as_u16(),
            reason,
            body,
        })
    }

    async fn execute(&self, request: RequestBuilder) -> RemoteResult<()> {
        self.send(request).await.map(|_| ())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Api {
            status,
            reason: format!("Unexpected response: {}", e),
            body: Some(body),
        })
    }
}

#[async_trait]
impl RemoteStorageApi for HttpApi {
    fn set_host(&mut self, host: &Url) {
        self.host = host.clone();
    }

    async fn cluster_version(&self, binding: ApiBinding) -> RemoteResult<ClusterVersion> {
        let url = self.platform_url(binding.platform_version(), "cluster/version")?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn upgrade_cluster(&self, binding: ApiBinding) -> RemoteResult<UpgradeCluster> {
        let url = self.platform_url(binding.platform_version(), "upgrade/cluster")?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn get_license(&self, binding: ApiBinding, name: &str) -> RemoteResult<LicenseList> {
        let resource = format!("license/licenses/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn list_zones(&self, binding: ApiBinding) -> RemoteResult<ZoneList> {
        let url = self.platform_url(binding.platform_version(), "zones")?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn update_zone(
        &self,
        binding: ApiBinding,
        zone: &str,
        settings: &Map<String, Value>,
    ) -> RemoteResult<()> {
        let resource = format!("zones/{}", urlencoding::encode(zone));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.execute(self.request(Method::PUT, url).json(settings))
            .await
    }

    async fn create_group(
        &self,
        binding: ApiBinding,
        params: &GroupCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let url = self.platform_url(binding.platform_version(), "auth/groups")?;
        let request = self
            .request(Method::POST, url)
            .query(&[("zone", zone)])
            .json(params);
        self.execute(request).await
    }

    async fn delete_group(&self, binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()> {
        let resource = format!("auth/groups/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.execute(self.request(Method::DELETE, url).query(&[("zone", zone)]))
            .await
    }

    async fn get_group(
        &self,
        binding: ApiBinding,
        name: &str,
        zone: &str,
    ) -> RemoteResult<AuthGroupList> {
        let resource = format!("auth/groups/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.fetch(self.request(Method::GET, url).query(&[("zone", zone)]))
            .await
    }

    async fn list_groups(&self, binding: ApiBinding, zone: &str) -> RemoteResult<AuthGroupList> {
        let url = self.platform_url(binding.platform_version(), "auth/groups")?;
        self.fetch(self.request(Method::GET, url).query(&[("zone", zone)]))
            .await
    }

    async fn create_user(
        &self,
        binding: ApiBinding,
        params: &UserCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let url = self.platform_url(binding.platform_version(), "auth/users")?;
        let request = self
            .request(Method::POST, url)
            .query(&[("zone", zone)])
            .json(params);
        self.execute(request).await
    }

    async fn delete_user(&self, binding: ApiBinding, name: &str, zone: &str) -> RemoteResult<()> {
        let resource = format!("auth/users/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.execute(self.request(Method::DELETE, url).query(&[("zone", zone)]))
            .await
    }

    async fn get_user(
        &self,
        binding: ApiBinding,
        name: &str,
        query_member_of: bool,
        zone: &str,
    ) -> RemoteResult<AuthUserList> {
        let resource = format!("auth/users/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        let mut request = self.request(Method::GET, url).query(&[("zone", zone)]);
        if query_member_of {
            request = request.query(&[("query_member_of", "true")]);
        }
        self.fetch(request).await
    }

    async fn list_users(&self, binding: ApiBinding, zone: &str) -> RemoteResult<AuthUserList> {
        let url = self.platform_url(binding.platform_version(), "auth/users")?;
        self.fetch(self.request(Method::GET, url).query(&[("zone", zone)]))
            .await
    }

    async fn add_group_member(
        &self,
        binding: ApiBinding,
        group: &str,
        member: &MemberRef,
        zone: &str,
    ) -> RemoteResult<()> {
        let resource = format!("auth/groups/{}/members", urlencoding::encode(group));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        let request = self
            .request(Method::POST, url)
            .query(&[("zone", zone)])
            .json(member);
        self.execute(request).await
    }

    async fn flush_auth_cache(&self, binding: ApiBinding, zone: &str) -> RemoteResult<()> {
        let request = if binding.uses_legacy_auth_cache_flush() {
            let url = self.platform_url(LEGACY_AUTH_CACHE_VERSION, "auth/users")?;
            self.request(Method::DELETE, url)
                .query(&[("cached", "true")])
        } else {
            let url = self.platform_url(binding.platform_version(), "auth/cache")?;
            self.request(Method::POST, url)
                .query(&[("zone", zone)])
                .json(&serde_json::json!({ "all": "all" }))
        };
        self.execute(request).await
    }

    async fn create_proxy_user(
        &self,
        binding: ApiBinding,
        params: &ProxyUserCreateParams,
        zone: &str,
    ) -> RemoteResult<()> {
        let url = self.platform_url(binding.platform_version(), "protocols/hdfs/proxyusers")?;
        let request = self
            .request(Method::POST, url)
            .query(&[("zone", zone)])
            .json(params);
        self.execute(request).await
    }

    async fn delete_proxy_user(
        &self,
        binding: ApiBinding,
        name: &str,
        zone: &str,
    ) -> RemoteResult<()> {
        let resource = format!("protocols/hdfs/proxyusers/{}", urlencoding::encode(name));
        let url = self.platform_url(binding.platform_version(), &resource)?;
        self.execute(self.request(Method::DELETE, url).query(&[("zone", zone)]))
            .await
    }

    async fn get_hdfs_settings(
        &self,
        binding: ApiBinding,
        zone: &str,
    ) -> RemoteResult<HdfsSettings> {
        let url = self.platform_url(binding.platform_version(), "protocols/hdfs/settings")?;
        let envelope: HdfsSettingsEnvelope = self
            .fetch(self.request(Method::GET, url).query(&[("zone", zone)]))
            .await?;
        Ok(envelope.settings)
    }

    async fn update_hdfs_settings(
        &self,
        binding: ApiBinding,
        settings: &Map<String, Value>,
        zone: &str,
    ) -> RemoteResult<()> {
        let url = self.platform_url(binding.platform_version(), "protocols/hdfs/settings")?;
        let request = self
            .request(Method::PUT, url)
            .query(&[("zone", zone)])
            .json(settings);
        self.execute(request).await
    }

    async fn create_directory(
        &self,
        _binding: ApiBinding,
        path: &str,
        mode: u32,
        recursive: bool,
        overwrite: bool,
    ) -> RemoteResult<()> {
        let url = self.namespace_url(path)?;
        let request = self
            .request(Method::PUT, url)
            .header("x-isi-ifs-target-type", "container")
            .header("x-isi-ifs-access-control", format!("{:o}", mode))
            .query(&[("recursive", recursive), ("overwrite", overwrite)]);
        self.execute(request).await
    }

    async fn delete_directory(
        &self,
        _binding: ApiBinding,
        path: &str,
        recursive: bool,
    ) -> RemoteResult<()> {
        let url = self.namespace_url(path)?;
        self.execute(self.request(Method::DELETE, url).query(&[("recursive", recursive)]))
            .await
    }

    async fn get_acl(&self, _binding: ApiBinding, path: &str) -> RemoteResult<NamespaceAcl> {
        let url = self.acl_url(path)?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn set_acl(&self, _binding: ApiBinding, path: &str, acl: &AclUpdate) -> RemoteResult<()> {
        let url = self.acl_url(path)?;
        self.execute(self.request(Method::PUT, url).json(acl)).await
    }
}

/// Percent-encode each component of an absolute path, without the leading `/`
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|component| urlencoding::encode(component).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a request failure to a connection failure, flagging TLS verification
fn transport_error(err: reqwest::Error) -> RemoteError {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    if reason.to_lowercase().contains("certificate") {
        RemoteError::certificate(reason)
    } else {
        RemoteError::connection(reason)
    }
}
