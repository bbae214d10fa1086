//! Simulated routers for tests

use mockito::{Mock, ServerGuard};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::jnap::{Endpoint, JnapClient, ACTION_NAMESPACE};

pub fn client_for(url: &str, password: &str) -> JnapClient {
    JnapClient::with_timeouts(
        Endpoint::new(url, password),
        Duration::from_secs(2),
        Duration::from_secs(1),
    )
    .unwrap()
}

/// Answer `action` once with a fixed JSON body
pub async fn mock_action(server: &mut ServerGuard, action: &str, body: &str) -> Mock {
    expect_action(server, action, body, 1).await
}

/// Answer `action` with a fixed JSON body, expecting exactly `hits` calls
pub async fn expect_action(server: &mut ServerGuard, action: &str, body: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/JNAP/")
        .match_header("x-jnap-action", format!("{}{}", ACTION_NAMESPACE, action).as_str())
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

/// A router that accepts connections and never answers
pub async fn unresponsive_router() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    (url, handle)
}

/// Log lines emitted on the current thread while the guard is alive
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route `tracing` output into a buffer, the way an operator would see it
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}
