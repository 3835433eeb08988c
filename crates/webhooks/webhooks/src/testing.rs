//! Loopback HTTP responder for delivery tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A tiny HTTP/1.1 server that answers POSTs with a scripted status
/// sequence and records what it received.
pub struct Responder {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(String, Option<String>)>>>,
}

impl Responder {
    /// Responds to every request with the same status and body.
    pub async fn always(status: u16, body: &str) -> Self {
        Self::sequence(vec![(status, body)]).await
    }

    /// Responds with each entry in order; the last entry repeats.
    pub async fn sequence(responses: Vec<(u16, &str)>) -> Self {
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(s, b)| (s, b.to_string()))
            .collect();
        assert!(!responses.is_empty());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));

        let hits_srv = hits.clone();
        let last_srv = last.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let responses = responses.clone();
                let hits = hits_srv.clone();
                let last = last_srv.clone();
                tokio::spawn(async move {
                    serve_connection(stream, responses, hits, last).await;
                });
            }
        });

        Self { addr, hits, last }
    }

    /// Target URL for this responder.
    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Body and `X-Webhook-Signature` header of the most recent request.
    pub fn last_request(&self) -> (String, Option<String>) {
        self.last
            .lock()
            .unwrap()
            .clone()
            .expect("no request received yet")
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    responses: Vec<(u16, String)>,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(String, Option<String>)>>>,
) {
    let mut buf = Vec::new();

    // Connection: close - one request per connection.
    let Some((head, body)) = read_request(&mut stream, &mut buf).await else {
        return;
    };

    let n = hits.fetch_add(1, Ordering::SeqCst);
    let signature = header_value(&head, "x-webhook-signature");
    *last.lock().unwrap() = Some((body, signature));

    let (status, response_body) = &responses[n.min(responses.len() - 1)];
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(*status),
        response_body.len(),
        response_body
    );

    if stream.write_all(response.as_bytes()).await.is_err() {
        return;
    }
    let _ = stream.shutdown().await;
}

/// Reads one HTTP request (headers + content-length body) off the stream.
async fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<(String, String)> {
    let header_end = loop {
        if let Some(pos) = find_subsequence(buf, b"\r\n\r\n") {
            break pos;
        }
        let mut chunk = [0u8; 4096];
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length: usize = header_value(&head, "content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let mut chunk = [0u8; 4096];
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();
    buf.drain(..body_start + content_length);
    Some((head, body))
}

fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
