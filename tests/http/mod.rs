use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tabledoc::config::context::build_metastore;
use tabledoc::config::schema::{load_config_from_string, HttpFrontend, TabledocConfig};
use tabledoc::frontend::http::filters;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Sender;
use tokio::task::JoinHandle;
use warp::hyper::body::to_bytes;
use warp::hyper::client::HttpConnector;
use warp::hyper::{Body, Client, Method, Request, Response, StatusCode};

mod lifecycle;
mod persistence;

/// A tabledoc HTTP server listening on a random free port, storing its
/// databases in a temporary directory
struct TestServer {
    addr: SocketAddr,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(data_dir: &TempDir) -> Self {
        let config_text = format!(
            r#"
[storage]
type = "local"
data_dir = "{}"

[frontend.http]
bind_host = "127.0.0.1"
bind_port = 0
"#,
            data_dir.path().display()
        );
        let config = load_config_from_string(&config_text, false).unwrap();
        Self::start_with_config(config).await
    }

    async fn start_with_config(config: TabledocConfig) -> Self {
        let metastore = build_metastore(&config).await.unwrap();
        let http: HttpFrontend = config.frontend.http.unwrap();

        let (tx, rx) = oneshot::channel();
        let (addr, server) = warp::serve(filters(Arc::new(metastore), http))
            .bind_with_graceful_shutdown(
                // Pass port :0 to pick a random free port
                "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
                async {
                    rx.await.ok();
                },
            );

        let handle = tokio::spawn(server);
        TestServer {
            addr,
            stop: tx,
            handle,
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap();
    }
}

async fn response_json(response: Response<Body>) -> Value {
    let body_bytes = to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

async fn post_json(
    client: &Client<HttpConnector>,
    uri: &str,
    body: Value,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = client.request(request).await.unwrap();
    (response.status(), response_json(response).await)
}

async fn get_json(client: &Client<HttpConnector>, uri: &str) -> (StatusCode, Value) {
    let response = client.get(uri.parse().unwrap()).await.unwrap();
    (response.status(), response_json(response).await)
}
