use std::{sync::Arc, time::Duration};

use reqwest::{
    Method,
    header::{ACCEPT, HeaderName, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;

use crate::{
    API_TOKEN_HEADER, DEFAULT_CLIENT_HEADER, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
    errors::{Error, Result, TransportError, TransportErrorKind},
    http::{HeaderList, execute_json},
    telemetry::{RequestContext, Telemetry},
};

#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Company subdomain, as in `https://{company_domain}.pipedrive.com`.
    pub company_domain: Option<String>,
    pub api_key: Option<String>,
    /// Full API base URL; takes precedence over `company_domain` when set.
    pub base_url: Option<String>,
    pub client_header: Option<String>,
    pub http_client: Option<reqwest::Client>,
    /// Override the connect timeout (defaults to 5s).
    pub connect_timeout: Option<Duration>,
    /// Override the request timeout (defaults to 60s).
    pub timeout: Option<Duration>,
    /// Default extra headers applied to all requests.
    pub default_headers: Option<HeaderList>,
    /// Diagnostics sink and HTTP metrics callbacks.
    pub diagnostics: Option<crate::telemetry::DiagnosticsCallbacks>,
}

/// Read-only Pipedrive API client for one company account.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    base_url: String,
    api_key: String,
    client_header: String,
    http: reqwest::Client,
    request_timeout: Duration,
    default_headers: Option<HeaderList>,
    pub(crate) telemetry: Telemetry,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let api_key = cfg
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("api key is required".to_string()))?;

        let base_source = match (cfg.base_url, cfg.company_domain) {
            (Some(base), _) if !base.trim().is_empty() => base.trim().to_string(),
            (_, Some(domain)) => base_url_for_domain(&domain)?,
            _ => {
                return Err(Error::Config(
                    "company domain or base url is required".to_string(),
                ));
            }
        };
        let base_url = base_source.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid base url: {err}")))?;

        let connect_timeout = cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let request_timeout = cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .build()
                .map_err(|err| TransportError {
                    kind: TransportErrorKind::Connect,
                    message: "failed to build http client".to_string(),
                    source: Some(err),
                })?,
        };

        let client_header = cfg
            .client_header
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_HEADER.to_string());

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                api_key,
                client_header,
                http,
                request_timeout,
                default_headers: cfg.default_headers,
                telemetry: Telemetry::new(cfg.diagnostics),
            }),
        })
    }

    /// API base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

/// `https://{domain}.pipedrive.com/api/v1`, rejecting anything but a bare
/// subdomain label.
pub(crate) fn base_url_for_domain(domain: &str) -> Result<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(Error::Config("company domain is required".to_string()));
    }
    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !domain.starts_with('-')
        && !domain.ends_with('-');
    if !valid {
        return Err(Error::Config(format!(
            "invalid company domain {domain:?}: expected the subdomain only"
        )));
    }
    Ok(format!("https://{domain}.pipedrive.com/api/v1"))
}

fn apply_header_list(
    mut builder: reqwest::RequestBuilder,
    headers: &HeaderList,
) -> Result<reqwest::RequestBuilder> {
    for entry in headers.iter() {
        if !entry.is_valid() {
            continue;
        }
        let name = HeaderName::from_bytes(entry.key.trim().as_bytes())
            .map_err(|err| Error::Config(format!("invalid header name: {err}")))?;
        let val = HeaderValue::from_str(entry.value.trim())
            .map_err(|err| Error::Config(format!("invalid header value: {err}")))?;
        builder = builder.header(name, val);
    }
    Ok(builder)
}

impl ClientInner {
    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url = reqwest::Url::parse(&url)
            .map_err(|err| Error::Config(format!("invalid path: {err}")))?;
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.client_header.as_str())
            .header(API_TOKEN_HEADER, self.api_key.as_str())
            .timeout(self.request_timeout);
        match &self.default_headers {
            Some(defaults) => apply_header_list(builder, defaults),
            None => Ok(builder),
        }
    }

    /// Single-attempt GET decoding a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        ctx: RequestContext,
    ) -> Result<T> {
        let builder = self.request(Method::GET, path)?.query(query);
        execute_json(builder, &self.telemetry, ctx).await
    }
}
