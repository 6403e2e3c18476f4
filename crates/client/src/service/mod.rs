//! Remote service access.
//!
//! ### Requests
//!
//! - **Read**: `GET <api_url>/<uri>`; `404` is a miss, not an error.
//! - **Create**: `PUT <api_url>/<uri>` with the entity reference.
//! - **Commit**: `PATCH` (v2) or `PUT` (v1) of a revision document. The
//!   service applies it asynchronously and answers `202` with a `Location`
//!   header naming the task.
//! - **Authentication**: HTTP Basic with repository name and access key.

pub mod url;

pub use self::url::{UrlError, endpoint, normalize_base};

use bytes::Bytes;
use datagator_core::{AppConfig, CommitDocument, CommitSink, Error, PushOutcome};
use futures_util::future::{self, Either};
use futures_util::stream;
use reqwest::{Body, Client, Method, StatusCode, header};
use serde_json::Value;
use std::io::{self, Read};
use std::pin::pin;
use std::time::Instant;
use tokio::sync::mpsc;

/// Size of the pieces a revision document is uploaded in.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Pieces read ahead of the connection.
const UPLOAD_QUEUE_DEPTH: usize = 4;

/// Operations the entity layer needs from the remote service.
#[async_trait::async_trait]
pub trait Service: CommitSink {
    /// Current document of the entity at `uri`, or `None` if it does not exist.
    async fn fetch(&self, uri: &str) -> Result<Option<Value>, Error>;

    /// Create or replace the entity at `uri` with `body`.
    async fn put(&self, uri: &str, body: &Value) -> Result<PushOutcome, Error>;
}

/// HTTP implementation of [`Service`].
#[derive(Debug, Clone)]
pub struct HttpService {
    http: Client,
    base: ::url::Url,
    commit_method: Method,
    auth: Option<(String, String)>,
}

impl HttpService {
    /// Create a new service client from the configuration.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let base = normalize_base(&config.service_url()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let redirect =
            if config.follow_redirects { reqwest::redirect::Policy::limited(5) } else { reqwest::redirect::Policy::none() };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(redirect)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        let commit_method = if config.is_v1() { Method::PUT } else { Method::PATCH };

        let auth = match (&config.repo, &config.access_key) {
            (Some(repo), Some(key)) => Some((repo.clone(), key.clone())),
            _ => None,
        };

        Ok(Self { http, base, commit_method, auth })
    }

    /// Base URL entity URIs are resolved against.
    pub fn base(&self) -> &::url::Url {
        &self.base
    }

    fn request(&self, method: Method, uri: &str) -> Result<reqwest::RequestBuilder, Error> {
        let url = endpoint(&self.base, uri).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let mut request = self.http.request(method, url).header(header::ACCEPT, "application/json");
        if let Some((user, key)) = &self.auth {
            request = request.basic_auth(user, Some(key));
        }
        Ok(request)
    }

    async fn send(&self, request: reqwest::RequestBuilder, uri: &str) -> Result<PushOutcome, Error> {
        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{uri}: {e}")))?;

        let status = response.status();
        let task = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        tracing::debug!("{} answered {} in {:?}", uri, status, start.elapsed());

        Ok(PushOutcome { status: status.as_u16(), task })
    }
}

#[async_trait::async_trait]
impl Service for HttpService {
    async fn fetch(&self, uri: &str) -> Result<Option<Value>, Error> {
        let response = self
            .request(Method::GET, uri)?
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{uri}: {e}")))?;

        let status = response.status();
        tracing::debug!("GET {} -> {}", uri, status);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Rejected { uri: uri.to_string(), status: status.as_u16() });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("{uri}: failed to read response: {e}")))?;
        let doc = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Transport(format!("{uri}: malformed response: {e}")))?;

        Ok(Some(doc))
    }

    async fn put(&self, uri: &str, body: &Value) -> Result<PushOutcome, Error> {
        let request = self.request(Method::PUT, uri)?.json(body);
        self.send(request, uri).await
    }
}

#[async_trait::async_trait]
impl CommitSink for HttpService {
    async fn push(&self, uri: &str, mut document: CommitDocument<'_>) -> Result<PushOutcome, Error> {
        tracing::debug!("{} {} ({} bytes)", self.commit_method, uri, document.len());

        let (tx, rx) = mpsc::channel::<Bytes>(UPLOAD_QUEUE_DEPTH);
        let chunks =
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (Ok::<_, io::Error>(chunk), rx)) });
        let request = self
            .request(self.commit_method.clone(), uri)?
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, document.len())
            .body(Body::wrap_stream(chunks));

        let send = pin!(self.send(request, uri));
        let upload = pin!(upload(&mut document, tx));
        match future::select(send, upload).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right((Ok(()), send)) => send.await,
            Either::Right((Err(e), _)) => Err(Error::Transport(format!("{uri}: failed to read revision: {e}"))),
        }
    }
}

/// Feed `document` to the request body piece by piece.
///
/// Stops quietly when the request no longer takes the body.
async fn upload(document: &mut CommitDocument<'_>, tx: mpsc::Sender<Bytes>) -> io::Result<()> {
    loop {
        let mut chunk = vec![0u8; UPLOAD_CHUNK_BYTES];
        let read = match document.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        chunk.truncate(read);
        if tx.send(Bytes::from(chunk)).await.is_err() {
            return Ok(());
        }
    }
}
