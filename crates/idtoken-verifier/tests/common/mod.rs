#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use idtoken_client::error::FetchError;
use idtoken_client::fetcher::{BoxFuture, HttpResponse, HttpTransport};
use idtoken_core::canonical::canonical_bytes;
use idtoken_core::token::{RawIdentityToken, TokenValidator};
use p256::ecdsa::signature::Signer as _;
use p256::pkcs8::DecodePrivateKey;
use url::Url;

pub const CERT_URL: &str = "https://valid.apple.com/public/public.cer";

/// In-memory transport serving fixed responses per URL and counting requests.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, HttpResponse>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn route(mut self, url: &str, status: u16, cache_control: Option<&str>, body: &[u8]) -> Self {
        self.routes.insert(
            url.to_owned(),
            HttpResponse {
                status,
                cache_control: cache_control.map(str::to_owned),
                body: body.to_vec(),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpTransport for FakeTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.routes.get(url.as_str()).cloned().unwrap_or(HttpResponse {
            status: 404,
            cache_control: None,
            body: Vec::new(),
        });
        Box::pin(async move { Ok(response) })
    }
}

/// A self-signed P-256 signer standing in for the platform identity service.
pub struct TestSigner {
    pub cert_der: Vec<u8>,
    key: p256::ecdsa::SigningKey,
}

impl TestSigner {
    pub fn new() -> Self {
        let certified = rcgen::generate_simple_self_signed(["valid.apple.com".to_owned()]).unwrap();
        let key = p256::ecdsa::SigningKey::from_pkcs8_der(&certified.key_pair.serialize_der()).unwrap();
        Self {
            cert_der: certified.cert.der().to_vec(),
            key,
        }
    }

    /// Sign the canonical bytes of `raw` and store the base64 signature in it.
    pub fn sign(&self, raw: &mut RawIdentityToken) {
        raw.signature = Some("AA==".to_owned());
        let token = TokenValidator::default().validate(raw).unwrap();
        let message = canonical_bytes(&token).unwrap();
        let signature: p256::ecdsa::Signature = self.key.sign(&message);
        raw.signature = Some(STANDARD.encode(signature.to_der().as_bytes()));
    }

    /// The token used throughout the tests, signed by this signer.
    pub fn mock_token(&self) -> RawIdentityToken {
        let mut raw = RawIdentityToken {
            player_id: Some("G:1111111".to_owned()),
            bundle_id: Some("com.valid.app".to_owned()),
            timestamp: Some(serde_json::json!(1_460_981_421_303_u64)),
            salt: Some("saltST==".to_owned()),
            signature: None,
            public_key_url: Some(CERT_URL.to_owned()),
        };
        self.sign(&mut raw);
        raw
    }
}
