//! Shared helpers for provider tests.

use std::sync::Arc;

use tallybar_core::ProviderKind;
use tallybar_fetch::{Environment, FetchError, FetchStrategy, InMemorySettings, ProviderFetchContext};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Starts a loopback HTTP server that answers every request with the same
/// canned response. Returns the base URL (`http://127.0.0.1:<port>`).
pub(crate) async fn serve_canned(status: u16, extra_headers: &[(&str, &str)], body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut response = format!(
        "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
        reason(status),
        body.len()
    );
    for (name, value) in extra_headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);
    let response = Arc::new(response);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let response = Arc::clone(&response);
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// Consumes the request head and any `content-length` body.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let Ok(n) = stream.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() - head_end < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Context with a stored API token and an empty environment.
pub(crate) fn token_context(provider: ProviderKind) -> ProviderFetchContext {
    ProviderFetchContext::builder(provider)
        .env(Environment::new())
        .settings(Arc::new(InMemorySettings::with_token(provider, "test-key")))
        .build()
}

/// Fetches once and returns the error together with the strategy's
/// fallback decision for it.
pub(crate) async fn fetch_error(
    strategy: &dyn FetchStrategy,
    ctx: &ProviderFetchContext,
) -> (FetchError, bool) {
    let err = strategy.fetch(ctx).await.unwrap_err();
    let fallback = strategy.should_fallback(&err, ctx);
    (err, fallback)
}
