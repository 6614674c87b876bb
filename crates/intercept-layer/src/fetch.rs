use crate::error::FetchError;
use bytes::Bytes;
use http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::future::Future;

/// The network. Origin-form request targets (`/path`) address the origin
/// server; absolute targets address their own host.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, FetchError>> + Send;
}

pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Fetcher backed by a pooled hyper client. Origin-form requests are sent to
/// `upstream`, the server that actually serves the origin.
///
/// The client has no TLS connector: absolute `https` targets (the font and
/// script CDNs on the allow-list) fail with [`FetchError::UnsupportedScheme`]
/// before any connection is attempted. Browsers load those hosts directly,
/// so only same-origin and plain-HTTP traffic reaches this fetcher.
pub struct HttpFetcher {
    client: HttpClient,
    upstream: String,
}

impl HttpFetcher {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            upstream: upstream.into(),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    fn target(&self, uri: &Uri) -> Result<Uri, FetchError> {
        match uri.scheme_str() {
            Some("http") => return Ok(uri.clone()),
            Some(_) => return Err(FetchError::UnsupportedScheme(uri.to_string())),
            None => {}
        }
        let target = format!(
            "{}{}",
            self.upstream.trim_end_matches('/'),
            uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
        );
        target
            .parse()
            .map_err(|e| FetchError::InvalidRequest(format!("{target}: {e}")))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, FetchError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.target(&parts.uri)?;
        strip_hop_by_hop(&mut parts.headers);
        // The client derives Host from the target URI.
        parts.headers.remove(HOST);

        let upstream_req = Request::from_parts(parts, Full::new(body));
        let uri = upstream_req.uri().clone();

        let upstream_resp = self.client.request(upstream_req).await.map_err(|e| {
            tracing::debug!(error = %e, upstream = %uri, "upstream request failed");
            FetchError::Connect(e.to_string())
        })?;

        let (mut parts, body) = upstream_resp.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
            .to_bytes();
        strip_hop_by_hop(&mut parts.headers);

        Ok(Response::from_parts(parts, body))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);
}
