#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use file_share::catalog::{FileCatalog, FileStorageApi, HttpFileStorage, UploadCandidate};
    use file_share::storage::retry::RetryConfig;
    use file_share::{CatalogError, DroppedFile};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answers every request with `status` and counts the requests it saw
    async fn stub_server(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(answer(stream, status, body));
            }
        });

        (format!("http://{}", address), hits)
    }

    async fn answer(mut stream: TcpStream, status: &'static str, body: &'static str) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn client(base_url: &str) -> HttpFileStorage {
        HttpFileStorage::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_files() {
        let (url, hits) = stub_server("200 OK", r##"[{"name":"a.md","type":"text/markdown","content":"# a"}]"##).await;

        let files: Vec<DroppedFile> = client(&url).list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.md");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_of_missing_file_counts_as_done() {
        let (url, hits) = stub_server("404 Not Found", r#"{"error":"not found"}"#).await;

        client(&url).delete("gone.txt").await.expect("404 on delete is not an error");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_upload_is_not_retried() {
        let (url, hits) = stub_server("400 Bad Request", r#"{"error":"unsupported"}"#).await;
        let catalog = FileCatalog::new(client(&url)).with_retry(RetryConfig::new(3, Duration::from_millis(5)));

        let report = catalog.upload(vec![UploadCandidate::new("notes.txt", "hi")]).await;

        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, CatalogError::Refused { status: 400, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, hits) = stub_server("503 Service Unavailable", "").await;
        let catalog = FileCatalog::new(client(&url)).with_retry(RetryConfig::new(3, Duration::from_millis(5)));

        let result = catalog.refresh().await;

        assert!(matches!(result, Err(CatalogError::Remote { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
