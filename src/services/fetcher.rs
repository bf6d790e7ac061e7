use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PipelineError;

/// Source of raw playlist text
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    async fn fetch(&self) -> Result<String, PipelineError>;
}

/// Fetches the playlist over HTTP with retry on network errors and 429.
///
/// `timeout` is the budget for the whole fetch. Each attempt gets an equal
/// share of it to produce response headers, so a hung upstream still leaves
/// room for the remaining retries. Backoff sleeps count against the budget.
pub struct HttpFetcher {
    client: Client,
    url: String,
    max_retries: u32,
    attempt_timeout: Duration,
    max_playlist_size_mb: usize,
}

impl HttpFetcher {
    pub fn new(
        url: &str,
        user_agent: &str,
        timeout: Duration,
        max_retries: u32,
        max_playlist_size_mb: usize,
    ) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            max_retries,
            attempt_timeout: attempt_timeout(timeout, max_retries),
            max_playlist_size_mb,
        })
    }

    fn max_bytes(&self) -> u64 {
        (self.max_playlist_size_mb as u64) * 1024 * 1024
    }

    fn too_large(&self, len: u64) -> PipelineError {
        PipelineError::Fetch(format!(
            "Playlist too large: {:.1}MB (limit {}MB)",
            len as f64 / 1024f64 / 1024f64,
            self.max_playlist_size_mb
        ))
    }

    /// Read the body chunk by chunk, aborting once it passes the size limit
    async fn read_body(&self, mut response: Response) -> Result<String, PipelineError> {
        let max_bytes = self.max_bytes();
        let mut body: Vec<u8> = Vec::new();

        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > max_bytes {
                return Err(self.too_large(body.len() as u64));
            }
        }

        String::from_utf8(body)
            .map_err(|e| PipelineError::Fetch(format!("Playlist is not valid UTF-8: {}", e)))
    }

    async fn fetch_with_retry(&self) -> Result<Response, PipelineError> {
        if self.url.is_empty() {
            return Err(PipelineError::Fetch("No playlist URL configured".to_string()));
        }

        let mut attempt = 0;
        loop {
            let sent = tokio::time::timeout(self.attempt_timeout, self.client.get(&self.url).send()).await;
            let Ok(sent) = sent else {
                if attempt < self.max_retries {
                    let backoff_ms = backoff_ms(attempt);
                    tracing::warn!("fetch_retry" = attempt + 1, "reason" = "timeout", "backoff_ms" = backoff_ms);
                    sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                    continue;
                }
                return Err(PipelineError::Timeout(self.attempt_timeout));
            };

            match sent {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        if let Some(len) = resp.content_length() {
                            if len > self.max_bytes() {
                                return Err(self.too_large(len));
                            }
                        }
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let backoff_ms = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "429", "backoff_ms" = backoff_ms);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(PipelineError::Fetch(status_message(status)));
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        let backoff_ms = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "network", "backoff_ms" = backoff_ms, error = %err);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

#[async_trait]
impl PlaylistFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<String, PipelineError> {
        let response = self.fetch_with_retry().await?;
        let text = self.read_body(response).await?;

        tracing::info!("Playlist size: {:.2} MB", text.len() as f64 / 1024.0 / 1024.0);
        Ok(text)
    }
}

/// Share of the fetch budget one attempt may spend waiting for headers
fn attempt_timeout(budget: Duration, max_retries: u32) -> Duration {
    budget / (max_retries.saturating_add(1))
}

/// Exponential backoff starting at 500ms, capped at 10s
fn backoff_ms(attempt: u32) -> u64 {
    (1u64 << attempt.min(16)).saturating_mul(500).min(10_000)
}

fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "Playlist not found (404). Check the URL.".to_string(),
        StatusCode::FORBIDDEN => "Access denied (403). The playlist may require authentication.".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "Too many requests (429). The upstream server is rate limiting.".to_string(),
        _ => {
            let reason = status.canonical_reason().unwrap_or("Error");
            format!("HTTP {}: {}", status.as_u16(), reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve every connection with `respond`, counting accepted connections
    async fn local_upstream<F, Fut>(respond: F) -> (String, Arc<AtomicUsize>)
    where
        F: Fn(tokio::net::TcpStream) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/list.m3u", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request).await;
                tokio::spawn(respond(stream));
            }
        });

        (url, accepted)
    }

    async fn write_chunk(stream: &mut tokio::net::TcpStream, data: &[u8]) -> std::io::Result<()> {
        stream.write_all(format!("{:x}\r\n", data.len()).as_bytes()).await?;
        stream.write_all(data).await?;
        stream.write_all(b"\r\n").await
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_ms(0), 500);
        assert_eq!(backoff_ms(1), 1000);
        assert_eq!(backoff_ms(3), 4000);
        assert_eq!(backoff_ms(10), 10_000);
        assert_eq!(backoff_ms(40), 10_000);
    }

    #[test]
    fn test_attempt_timeout_splits_budget() {
        assert_eq!(attempt_timeout(Duration::from_secs(30), 2), Duration::from_secs(10));
        assert_eq!(attempt_timeout(Duration::from_secs(30), 0), Duration::from_secs(30));
    }

    #[test]
    fn test_status_message() {
        assert!(status_message(StatusCode::NOT_FOUND).contains("404"));
        assert_eq!(status_message(StatusCode::BAD_GATEWAY), "HTTP 502: Bad Gateway");
    }

    #[tokio::test]
    async fn test_empty_url_is_fetch_failure() {
        let fetcher = HttpFetcher::new("", "test", Duration::from_secs(1), 0, 10).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_chunked_body_within_limit() {
        let (url, _) = local_upstream(|mut stream| async move {
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n")
                .await;
            let _ = write_chunk(&mut stream, b"#EXTM3U\n").await;
            let _ = write_chunk(&mut stream, b"#EXTINF:-1,Ch1\nhttp://x/1\n").await;
            let _ = stream.write_all(b"0\r\n\r\n").await;
        })
        .await;

        let fetcher = HttpFetcher::new(&url, "test", Duration::from_secs(5), 0, 1).unwrap();
        let text = fetcher.fetch().await.unwrap();
        assert_eq!(text, "#EXTM3U\n#EXTINF:-1,Ch1\nhttp://x/1\n");
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_aborts_early() {
        let (url, _) = local_upstream(|mut stream| async move {
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
                .await;
            let chunk = vec![b'#'; 64 * 1024];
            for _ in 0..48 {
                if write_chunk(&mut stream, &chunk).await.is_err() {
                    return;
                }
            }
            // never terminate the body
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
        .await;

        let fetcher = HttpFetcher::new(&url, "test", Duration::from_secs(10), 0, 1).unwrap();
        let started = std::time::Instant::now();
        let err = fetcher.fetch().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            PipelineError::Fetch(msg) => assert!(msg.starts_with("Playlist too large"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hung_upstream_is_retried_per_attempt() {
        let (url, accepted) = local_upstream(|stream| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(stream);
        })
        .await;

        let fetcher = HttpFetcher::new(&url, "test", Duration::from_millis(900), 1, 1).unwrap();
        let err = fetcher.fetch().await.unwrap_err();

        assert_eq!(err, PipelineError::Timeout(Duration::from_millis(450)));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }
}
