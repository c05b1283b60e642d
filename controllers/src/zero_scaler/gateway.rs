use std::fmt::Debug;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, Response, StatusCode,
};
use resources::{
    config::ScalerConfig, models::ScaleServiceRequest, objects::function::FunctionStatus,
};
use serde::Serialize;

/// Control plane of the function platform.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_functions(&self) -> Result<Vec<FunctionStatus>>;

    async fn scale_function(&self, request: &ScaleServiceRequest) -> Result<()>;
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    basic_auth: Option<(String, String)>,
}

impl GatewayClient {
    /// Fails when one of the configured headers is malformed.
    pub fn new(client: Client, config: &ScalerConfig) -> Result<Self> {
        let headers = parse_headers(&config.gateway_headers)?;
        let basic_auth = config
            .basic_auth()
            .map(|(user, password)| (user.to_owned(), password.to_owned()));
        Ok(Self {
            client,
            base_url: config.gateway_uri.trim_end_matches('/').to_owned(),
            headers,
            basic_auth,
        })
    }

    async fn call<T: Serialize + Debug + ?Sized>(
        &self,
        method: Method,
        path: &str,
        data: Option<&T>,
        expected: StatusCode,
    ) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, url.as_str())
            .headers(self.headers.clone());
        if let Some((user, password)) = &self.basic_auth {
            tracing::debug!("Setting basic auth header");
            request = request.basic_auth(user, Some(password));
        }
        if let Some(data) = data {
            tracing::debug!("Using data: {:?}", data);
            request = request.json(data);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to call gateway at {}", url))?;
        tracing::trace!("Gateway response: {:?}", response);

        let status = response.status();
        if status != expected {
            let body = response
                .text()
                .await
                .with_context(|| "Failed to read body response from gateway")?;
            tracing::debug!("Bad gateway response, body returned: {}", body);
            return Err(anyhow!(
                "invalid response from gateway, with status {}",
                status.as_u16()
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn list_functions(&self) -> Result<Vec<FunctionStatus>> {
        let functions = self
            .call::<()>(Method::GET, "system/functions", None, StatusCode::OK)
            .await?
            .json::<Vec<FunctionStatus>>()
            .await
            .with_context(|| "Failed to decode function list")?;
        tracing::debug!("Parsed gateway response: {:?}", functions);
        Ok(functions)
    }

    async fn scale_function(&self, request: &ScaleServiceRequest) -> Result<()> {
        self.call(
            Method::POST,
            &format!("system/scale-function/{}", request.service_name),
            Some(request),
            StatusCode::ACCEPTED,
        )
        .await?;
        Ok(())
    }
}

/// Parse `Key: Value` header specs. The first `:` separates key from value,
/// both sides are trimmed.
pub fn parse_headers(specs: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for spec in specs {
        let (key, value) = spec
            .split_once(':')
            .ok_or_else(|| anyhow!("invalid header '{}' provided", spec))?;
        let name = HeaderName::from_bytes(key.trim().as_bytes())
            .with_context(|| format!("invalid header name in '{}'", spec))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid header value in '{}'", spec))?;
        tracing::debug!("Adding header to requests: {}", name);
        headers.append(name, value);
    }
    Ok(headers)
}
