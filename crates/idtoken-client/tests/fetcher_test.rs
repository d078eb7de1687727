use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idtoken_client::cache::{CertificateStore, InMemoryCertificateStore};
use idtoken_client::error::FetchError;
use idtoken_client::fetcher::{BoxFuture, CertificateFetcher, HttpResponse, HttpTransport};
use idtoken_core::pem::{pem_to_der, PEM_FOOTER, PEM_HEADER};
use url::Url;

/// Serves one canned response and counts requests.
struct CannedTransport {
    response: HttpResponse,
    calls: AtomicUsize,
}

impl CannedTransport {
    fn new(status: u16, cache_control: Option<&str>, body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            response: HttpResponse {
                status,
                cache_control: cache_control.map(str::to_owned),
                body: body.to_vec(),
            },
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpTransport for CannedTransport {
    fn get<'a>(&'a self, _url: &'a Url) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        Box::pin(async move { Ok(response) })
    }
}

struct FailingTransport;

impl HttpTransport for FailingTransport {
    fn get<'a>(&'a self, _url: &'a Url) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async { Err(FetchError::Transport("connection reset".to_owned())) })
    }
}

fn cert_url() -> Url {
    Url::parse("https://valid.apple.com/public/public.cer").unwrap()
}

const DER: &[u8] = &[0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00];

#[tokio::test]
async fn fetch_wraps_body_as_pem_with_ttl() {
    let transport = CannedTransport::new(200, Some("max-age=300"), DER);
    let fetcher = CertificateFetcher::new(transport.clone());

    let fetched = fetcher.fetch(&cert_url()).await.unwrap();

    assert!(fetched.pem.starts_with(PEM_HEADER));
    assert!(fetched.pem.ends_with(PEM_FOOTER));
    assert_eq!(pem_to_der(&fetched.pem).unwrap(), DER);
    assert_eq!(fetched.ttl, Some(Duration::from_secs(295)));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn fetch_without_cache_control_has_no_ttl() {
    let fetcher = CertificateFetcher::new(CannedTransport::new(200, None, DER));
    assert_eq!(fetcher.fetch(&cert_url()).await.unwrap().ttl, None);
}

#[tokio::test]
async fn custom_margin_applies() {
    let fetcher = CertificateFetcher::new(CannedTransport::new(200, Some("max-age=10"), DER))
        .with_freshness_margin(Duration::ZERO);
    assert_eq!(
        fetcher.fetch(&cert_url()).await.unwrap().ttl,
        Some(Duration::from_secs(10))
    );
}

#[tokio::test]
async fn not_found_is_a_fetch_error() {
    let fetcher = CertificateFetcher::new(CannedTransport::new(404, Some("max-age=300"), b"nope"));
    let err = fetcher.fetch(&cert_url()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn empty_body_is_a_fetch_error() {
    let fetcher = CertificateFetcher::new(CannedTransport::new(200, Some("max-age=300"), b""));
    let err = fetcher.fetch(&cert_url()).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyBody { .. }));
}

#[tokio::test]
async fn transport_errors_propagate() {
    let fetcher = CertificateFetcher::new(Arc::new(FailingTransport));
    let store = InMemoryCertificateStore::new();
    let err = fetcher.fetch_cached(&cert_url(), &store).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_cached_reuses_until_expiry() {
    let transport = CannedTransport::new(200, Some("public, max-age=300"), DER);
    let fetcher = CertificateFetcher::new(transport.clone());
    let store = InMemoryCertificateStore::new();

    let first = fetcher.fetch_cached(&cert_url(), &store).await.unwrap();
    tokio::time::advance(Duration::from_secs(294)).await;
    let second = fetcher.fetch_cached(&cert_url(), &store).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    fetcher.fetch_cached(&cert_url(), &store).await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn uncacheable_response_is_fetched_every_time() {
    let transport = CannedTransport::new(200, Some("max-age=0"), DER);
    let fetcher = CertificateFetcher::new(transport.clone());
    let store = InMemoryCertificateStore::new();

    fetcher.fetch_cached(&cert_url(), &store).await.unwrap();
    fetcher.fetch_cached(&cert_url(), &store).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert!(store.get(cert_url().as_str()).is_none());
}

#[tokio::test]
async fn failed_fetch_does_not_populate_store() {
    let fetcher = CertificateFetcher::new(CannedTransport::new(404, Some("max-age=300"), DER));
    let store = InMemoryCertificateStore::new();
    assert!(fetcher.fetch_cached(&cert_url(), &store).await.is_err());
    assert!(store.is_empty());
}
