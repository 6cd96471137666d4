use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use twdict_config::dictionary::SourceConfig;
use twdict_config::network::NetworkConfig;

use crate::error::FetchError;
use crate::retry::with_retries;
use crate::version::highest_version;
use crate::{ArchiveFetcher, DownloadedArchive, VersionSource, archive_filename};

/// reqwest-backed publisher client. Certificates are always validated.
///
/// Downloads time out only when the connection stalls for longer than
/// `timeout_seconds`; a slow but steady transfer runs to completion. Page
/// probes carry a total deadline.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    network: NetworkConfig,
}

impl HttpSource {
    pub fn new(network: NetworkConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("twdict/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(network.page_timeout())
            .read_timeout(network.timeout())
            .build()?;

        Ok(Self { client, network })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.network.page_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    async fn download_once(&self, url: &str, temp_dir: &Path) -> Result<DownloadedArchive, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        tokio::fs::create_dir_all(temp_dir).await?;
        let file = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".zip")
            .tempfile_in(temp_dir)?;
        let mut out = tokio::fs::File::from_std(file.reopen()?);

        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        out.flush().await?;
        out.sync_all().await?;

        Ok(DownloadedArchive {
            file,
            filename: archive_filename(url),
            bytes,
        })
    }
}

#[async_trait::async_trait]
impl VersionSource for HttpSource {
    async fn latest_version(
        &self,
        dictionary_id: &str,
        source: &SourceConfig,
    ) -> Result<String, FetchError> {
        let cancel = CancellationToken::new();
        let page = with_retries(&self.network, &cancel, "version probe", || {
            self.fetch_page(&source.page_url)
        })
        .await?;

        let latest = highest_version(&page, &source.version_pattern)?;
        latest.ok_or_else(|| FetchError::VersionNotFound {
            dictionary_id: dictionary_id.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ArchiveFetcher for HttpSource {
    async fn fetch(
        &self,
        url: &str,
        temp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadedArchive, FetchError> {
        tracing::info!("Downloading {}", url);

        let archive = with_retries(&self.network, cancel, "download", || {
            self.download_once(url, temp_dir)
        })
        .await?;

        tracing::info!("Downloaded {} ({} bytes)", archive.filename, archive.bytes);
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one response whose body arrives in `chunks`, `gap` apart.
    async fn trickle_server(chunks: &'static [&'static str], gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let length: usize = chunks.iter().map(|c| c.len()).sum();
            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n");
            socket.write_all(head.as_bytes()).await.unwrap();
            for chunk in chunks {
                tokio::time::sleep(gap).await;
                socket.write_all(chunk.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
        });

        format!("http://{addr}/dict_concised_2014_20251229.zip")
    }

    #[tokio::test]
    async fn slow_steady_download_outlasts_timeout() {
        let network = NetworkConfig {
            timeout_seconds: 1,
            max_retries: 0,
            ..NetworkConfig::default()
        };
        let source = HttpSource::new(network).unwrap();
        let url = trickle_server(&["PK", "zip", "body", "tail"], Duration::from_millis(400)).await;
        let dir = tempfile::tempdir().unwrap();

        let archive = source
            .fetch(&url, dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(archive.bytes, 13);
        assert_eq!(archive.filename, "dict_concised_2014_20251229.zip");
        assert_eq!(std::fs::read_to_string(archive.path()).unwrap(), "PKzipbodytail");
    }
}
