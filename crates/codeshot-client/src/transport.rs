use async_trait::async_trait;
use codeshot_api_types::RenderRequest;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Raw response as seen on the wire: the declared content type and body,
/// before any dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Network boundary of the page controller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the render request and return the undispatched response.
    async fn render(&self, request: &RenderRequest) -> Result<RawResponse, TransportError>;

    /// GET the default options template as raw text.
    async fn fetch_default_options(&self) -> Result<String, TransportError>;
}

/// reqwest-backed [`Transport`] speaking to a codeshot server.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(site: &str) -> Result<Self, TransportError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("codeshot-client/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base.join(path).map_err(TransportError::Url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn render(&self, request: &RenderRequest) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(self.url("/code/")?)
            .json(request)
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { content_type, body })
    }

    async fn fetch_default_options(&self) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.url("/assets/imgs/default-image.json")?)
            .send()
            .await?;
        Ok(response.text().await?)
    }
}
