//! Concurrent callers hitting an expired short credential at the same time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use assert2::check;
use twintoken::middleware::{DualTokenLayer, RefreshStrategy};
use twintoken::{CredentialProvider, HttpClient, HyperClient, Method, Request};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const CALLERS: usize = 6;

/// Provider that records how many refreshes ran and whether any overlapped.
#[derive(Default)]
struct SlowTokens {
    generation: AtomicU32,
    refreshes: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl CredentialProvider for SlowTokens {
    fn long_credential_header(&self) -> &str {
        "X-Refresh-Token"
    }

    fn long_credential(&self) -> String {
        "long-lived".to_string()
    }

    fn short_credential_header(&self) -> &str {
        "X-Access-Token"
    }

    fn short_credential(&self) -> String {
        match self.generation.load(Ordering::SeqCst) {
            0 => "stale".to_string(),
            n => format!("fresh-{n}"),
        }
    }

    fn is_short_credential_expired(&self, body: &str) -> bool {
        body.contains("TOKEN_EXPIRED")
    }

    async fn refresh_short_credential(&self) -> twintoken::Result<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        self.generation.fetch_add(1, Ordering::SeqCst);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn expiring_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("X-Access-Token", "stale"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": "TOKEN_EXPIRED"})),
        )
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .mount(&server)
        .await;

    server
}

async fn run_callers(client: &HyperClient, server: &MockServer) {
    let url = url::Url::parse(&format!("{}/feed", server.uri())).expect("url");

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..CALLERS {
        let client = client.clone();
        let request = Request::builder(Method::GET, url.clone()).build();
        tasks.spawn(async move { client.execute(request).await });
    }

    while let Some(joined) = tasks.join_next().await {
        let response = joined.expect("task").expect("response");
        check!(response.text().is_some_and(|body| body.contains("items")));
    }
}

async fn stale_dispatches(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .iter()
        .filter(|request| {
            request
                .headers
                .get("x-access-token")
                .is_some_and(|value| value == "stale")
        })
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serialized_refreshes_never_overlap() {
    let server = expiring_server().await;
    let tokens = Arc::new(SlowTokens::default());
    let client = HyperClient::builder()
        .with_dual_token(Arc::clone(&tokens))
        .build();

    run_callers(&client, &server).await;

    // every caller that saw the expiry refreshed, one at a time
    let refreshes = tokens.refreshes.load(Ordering::SeqCst);
    check!(refreshes as usize == stale_dispatches(&server).await);
    check!(refreshes >= 1);
    check!(tokens.max_in_flight.load(Ordering::SeqCst) == 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_flight_refreshes_once() {
    let server = expiring_server().await;
    let tokens = Arc::new(SlowTokens::default());
    let layer =
        DualTokenLayer::new(Arc::clone(&tokens)).refresh_strategy(RefreshStrategy::SingleFlight);
    let client = HyperClient::builder().with_dual_token_layer(layer).build();

    run_callers(&client, &server).await;

    check!(tokens.refreshes.load(Ordering::SeqCst) == 1);
    check!(tokens.max_in_flight.load(Ordering::SeqCst) == 1);
    check!(stale_dispatches(&server).await >= 1);
}
