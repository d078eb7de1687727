//! Certificate retrieval: HTTP transport trait, `reqwest` implementation and
//! the fetcher that turns a response into a cacheable PEM certificate.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use idtoken_core::pem::der_to_pem;
use log::{debug, info};
use reqwest::header::CACHE_CONTROL;
use url::Url;

use crate::cache::CertificateStore;
use crate::error::FetchError;

/// Boxed future returned by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Safety margin subtracted from the origin's `max-age` before caching.
pub const DEFAULT_FRESHNESS_MARGIN: Duration = Duration::from_millis(5_000);

/// The parts of an HTTP response the fetcher needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Cache-Control` header value, if present.
    pub cache_control: Option<String>,
    /// Response body (a DER certificate on success).
    pub body: Vec<u8>,
}

/// Performs a GET request and waits for the complete response.
pub trait HttpTransport: Send + Sync {
    /// Fetch `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request cannot be completed.
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<HttpResponse, FetchError>>;
}

/// `reqwest`-backed [`HttpTransport`] that refuses plain HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Arc<reqwest::Client>,
}

impl ReqwestTransport {
    /// Build a transport, optionally bounding each request by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().https_only(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: Arc::new(builder.build()?),
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async move {
            debug!("requesting certificate from {url}");

            let response = self.http.get(url.clone()).send().await?;
            let status = response.status().as_u16();
            let cache_control = response
                .headers()
                .get(CACHE_CONTROL)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.bytes().await?.to_vec();

            Ok(HttpResponse {
                status,
                cache_control,
                body,
            })
        })
    }
}

/// A certificate as served by its origin, with the lifetime it may be cached for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCertificate {
    /// PEM-encoded certificate.
    pub pem: String,
    /// How long the certificate may be cached; `None` means do not cache.
    pub ttl: Option<Duration>,
}

/// Downloads signer certificates and derives their cache lifetime.
#[derive(Clone)]
pub struct CertificateFetcher {
    transport: Arc<dyn HttpTransport>,
    freshness_margin: Duration,
}

impl fmt::Debug for CertificateFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateFetcher")
            .field("freshness_margin", &self.freshness_margin)
            .finish_non_exhaustive()
    }
}

impl CertificateFetcher {
    /// Create a fetcher using `transport` and the default freshness margin.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            freshness_margin: DEFAULT_FRESHNESS_MARGIN,
        }
    }

    /// Replace the margin subtracted from the origin's `max-age`.
    #[must_use]
    pub fn with_freshness_margin(mut self, margin: Duration) -> Self {
        self.freshness_margin = margin;
        self
    }

    /// Return the margin subtracted from the origin's `max-age`.
    #[must_use]
    pub fn freshness_margin(&self) -> Duration {
        self.freshness_margin
    }

    /// Download the certificate at `url` and wrap it as PEM.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails, the status is not 200 or
    /// the body is empty.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedCertificate, FetchError> {
        let response = self.transport.get(url).await?;

        if response.status != 200 {
            return Err(FetchError::UnexpectedStatus {
                status: response.status,
                url: url.to_string(),
            });
        }
        if response.body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        let ttl = response
            .cache_control
            .as_deref()
            .and_then(parse_max_age)
            .and_then(|max_age| ttl_from_max_age(max_age, self.freshness_margin));

        info!(
            "fetched certificate from {url} ({} bytes, ttl {ttl:?})",
            response.body.len()
        );

        Ok(FetchedCertificate {
            pem: der_to_pem(&response.body),
            ttl,
        })
    }

    /// Return the PEM certificate for `url` from `store`, fetching and storing
    /// it on a miss.
    ///
    /// Concurrent misses for the same URL each fetch; the last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if a fetch is needed and fails. Failed fetches
    /// leave the store untouched.
    pub async fn fetch_cached(
        &self,
        url: &Url,
        store: &dyn CertificateStore,
    ) -> Result<String, FetchError> {
        let key = url.as_str();
        if let Some(hit) = store.get(key) {
            debug!("certificate cache hit for {key}");
            return Ok(hit.pem);
        }
        debug!("certificate cache miss for {key}");

        let fetched = self.fetch(url).await?;
        if let Some(ttl) = fetched.ttl {
            store.put(key, fetched.pem.clone(), ttl);
        }
        Ok(fetched.pem)
    }
}

/// Extract the `max-age` directive, in seconds, from a `Cache-Control` value.
#[must_use]
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value.trim().trim_matches('"').parse().ok()
    })
}

/// Cache lifetime for a `max-age` of `max_age_secs` after subtracting `margin`.
///
/// Returns `None` when nothing positive remains.
#[must_use]
pub fn ttl_from_max_age(max_age_secs: u64, margin: Duration) -> Option<Duration> {
    Duration::from_secs(max_age_secs)
        .checked_sub(margin)
        .filter(|ttl| !ttl.is_zero())
}
