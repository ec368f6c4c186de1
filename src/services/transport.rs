use crate::constants::network::MAX_REDIRECTS;
use crate::errors::ClientError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct MultipartForm {
    pub file_field: String,
    pub file_name: String,
    pub bytes: Bytes,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A fully resolved request: absolute URL and final headers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single network seam of the client. Tests swap in scripted transports.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, ClientError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|err| {
                ClientError::unexpected(
                    "ClientBuildError",
                    format!("Failed to build HTTP client: {}", err),
                )
            })?;
        Ok(Self { client })
    }
}

fn headers_to_headermap(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ClientError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            ClientError::unexpected("InvalidHeader", format!("Invalid header name: {}", key))
        })?;
        let val = HeaderValue::from_str(value).map_err(|_| {
            ClientError::unexpected("InvalidHeader", format!("Invalid value for header {}", key))
        })?;
        map.insert(name, val);
    }
    Ok(map)
}

fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|text| (key.as_str().to_lowercase(), text.to_string()))
        })
        .collect()
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Timeout(err.to_string());
    }
    if err.is_connect() {
        return ClientError::Connection(err.to_string());
    }
    if err.is_redirect() {
        return ClientError::unexpected("TooManyRedirects", err.to_string());
    }
    ClientError::unexpected("TransportError", err.to_string())
}

fn build_form(form: &MultipartForm) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(form.bytes.to_vec()).file_name(form.file_name.clone());
    form.fields.iter().fold(
        reqwest::multipart::Form::new().part(form.file_field.clone(), part),
        |acc, (name, value)| acc.text(name.clone(), value.clone()),
    )
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers_to_headermap(&request.headers)?);
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(form) => builder.multipart(build_form(form)),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = headers_to_map(response.headers());
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
