use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

pub(crate) fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));
    Client::builder().build::<_, Body>(connector)
}

/// Posts a JSON body and returns the status with the full response body.
pub(crate) async fn post_json(
    client: &HyperClient,
    endpoint: &Uri,
    body: Vec<u8>,
    deadline: Duration,
) -> AdapterResult<(StatusCode, Bytes)> {
    let request = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

    let exchange = async {
        let response = client.request(request).await.map_err(|err| {
            AdapterError::transport(format!("request to {endpoint} failed: {err}"))
        })?;
        let status = response.status();
        let bytes = to_bytes(response.into_body())
            .await
            .map_err(|err| AdapterError::transport(format!("failed to read response: {err}")))?;
        Ok::<_, AdapterError>((status, bytes))
    };

    timeout(deadline, exchange)
        .await
        .map_err(|_| AdapterError::transport(format!("request to {endpoint} timed out")))?
}
