use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use hypmirror_verify::{Hasher, Md5Hasher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::core::{content_disposition_file_name, range_header, url_file_name};
use crate::data::{FetchOptions, FetchPhase, Progress, RemoteMeta};
use crate::effects::http::{HttpClient, HttpResponse};
use crate::error::{Error, Result};

/// Suffix of the staging file a transfer writes before it is committed.
const STAGING_SUFFIX: &str = ".part";

const RANGE_NOT_SATISFIABLE: u16 = 416;

/// Staging location for `destination`: a sibling with a `.part` suffix.
pub fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(STAGING_SUFFIX);
    destination.with_file_name(name)
}

/// Downloads files with verification and atomic placement.
pub struct Fetcher<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self { Self { client } }

    pub fn client(&self) -> &C { &self.client }

    /// Ask the server for the resource's name and size without transferring it.
    pub async fn probe(&self, url: &str) -> Result<RemoteMeta> {
        let head = self.client.head(url).await.map_err(|e| Error::Network(e.to_string()))?;
        if !(200..300).contains(&head.status) {
            return Err(Error::HttpStatus {
                status: head.status,
                url:    url.to_string(),
            });
        }

        let file_name = head
            .content_disposition
            .as_deref()
            .and_then(content_disposition_file_name)
            .or_else(|| {
                let effective = head.final_url.as_deref().unwrap_or(url);
                url::Url::parse(effective).ok().as_ref().and_then(url_file_name)
            });

        Ok(RemoteMeta {
            file_name,
            total_bytes: head.content_length,
        })
    }

    /// Fetch `url` into `destination`.
    ///
    /// When `destination` already exists and matches the expected checksum the
    /// transfer is skipped. Otherwise bytes are streamed into the staging file,
    /// resuming it when possible, verified, then renamed into place. On a
    /// verification failure the staging file is removed so the next attempt
    /// starts clean.
    ///
    /// A staging file that already holds `expected_size` verified bytes is
    /// committed without a request. A `416` answer to a range request
    /// discards the staging file and restarts from zero.
    pub async fn fetch(&self, url: &str, destination: &Path, options: FetchOptions) -> Result<PathBuf> {
        let mut progress = Progress {
            phase:            FetchPhase::Connecting,
            bytes_downloaded: 0,
            total_bytes:      options.expected_size,
            resumed_from:     0,
        };
        report(&options, &progress);

        if let Some(expected) = options.checksum
            && is_complete(destination, &expected).await
        {
            tracing::debug!(path = %destination.display(), "destination already verified, skipping transfer");
            progress.phase = FetchPhase::Completed;
            progress.bytes_downloaded = tokio::fs::metadata(destination).await?.len();
            report(&options, &progress);
            return Ok(destination.to_path_buf());
        }

        let staging = staging_path(destination);
        let mut existing = if options.resume {
            match tokio::fs::metadata(&staging).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            }
        } else {
            0
        };

        // A staging file holding every byte was interrupted before the
        // rename; a range request past its end cannot be satisfied.
        if existing > 0
            && let Some(expected_size) = options.expected_size
            && existing >= expected_size
        {
            if existing == expected_size && staging_matches(&staging, options.checksum).await {
                tracing::debug!(path = %staging.display(), "staging file already complete, committing");
                progress.resumed_from = existing;
                progress.bytes_downloaded = existing;
                progress.phase = FetchPhase::Verifying;
                report(&options, &progress);
                return commit(&staging, destination, &options, progress).await;
            }
            tracing::debug!(path = %staging.display(), bytes = existing, "discarding unusable staging file");
            hypmirror_fs::remove_file_if_exists(&staging)?;
            existing = 0;
        }

        let mut headers = options.headers.to_vec();
        if existing > 0 {
            headers.push(range_header(existing));
        }

        let mut response = self.request(url, &headers).await?;
        if existing > 0 && response.status == RANGE_NOT_SATISFIABLE {
            tracing::debug!(path = %staging.display(), offset = existing, "range not satisfiable, restarting transfer");
            hypmirror_fs::remove_file_if_exists(&staging)?;
            existing = 0;
            response = self.request(url, &options.headers).await?;
        }
        if !(200..300).contains(&response.status) {
            return Err(Error::HttpStatus {
                status: response.status,
                url:    url.to_string(),
            });
        }

        let resumed = existing > 0 && response.status == 206;
        let mut hasher = Md5Hasher::new();
        let mut file = if resumed {
            hash_prefix(&staging, &mut hasher).await?;
            tokio::fs::OpenOptions::new().append(true).open(&staging).await?
        } else {
            tokio::fs::File::create(&staging).await?
        };

        progress.resumed_from = if resumed { existing } else { 0 };
        progress.bytes_downloaded = progress.resumed_from;
        if progress.total_bytes.is_none() {
            progress.total_bytes = response.content_length.map(|len| len + progress.resumed_from);
        }
        progress.phase = FetchPhase::Downloading;
        report(&options, &progress);

        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Network(e.to_string()))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            progress.bytes_downloaded += chunk.len() as u64;
            report(&options, &progress);
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        progress.phase = FetchPhase::Verifying;
        report(&options, &progress);

        if let Err(e) = verify(&options, progress.bytes_downloaded, hasher) {
            hypmirror_fs::remove_file_if_exists(&staging)?;
            return Err(e);
        }

        commit(&staging, destination, &options, progress).await
    }

    async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse<C::Error>> {
        self.client.stream(url, headers).await.map_err(|e| Error::Network(e.to_string()))
    }
}

async fn commit(staging: &Path, destination: &Path, options: &FetchOptions, mut progress: Progress) -> Result<PathBuf> {
    progress.phase = FetchPhase::Committing;
    report(options, &progress);

    tokio::fs::rename(staging, destination).await?;

    progress.phase = FetchPhase::Completed;
    report(options, &progress);

    Ok(destination.to_path_buf())
}

fn report(options: &FetchOptions, progress: &Progress) {
    if let Some(ref callback) = options.on_progress {
        callback(progress);
    }
}

fn verify(options: &FetchOptions, written: u64, hasher: Md5Hasher) -> Result<()> {
    if let Some(expected) = options.expected_size
        && expected != written
    {
        return Err(Error::SizeMismatch {
            expected,
            actual: written,
        });
    }

    let actual = hasher.finalize();
    if let Some(expected) = options.checksum
        && actual.as_slice() != expected.as_slice()
    {
        return Err(Error::ChecksumMismatch {
            expected: hex::encode(expected),
            actual:   hex::encode(actual),
        });
    }

    Ok(())
}

/// Whether a staging file of the right length also carries the right digest.
async fn staging_matches(staging: &Path, checksum: Option<[u8; 16]>) -> bool {
    match checksum {
        Some(expected) => is_complete(staging, &expected).await,
        None => true,
    }
}

async fn is_complete(destination: &Path, expected: &[u8; 16]) -> bool {
    let path = destination.to_path_buf();
    let expected = *expected;
    tokio::task::spawn_blocking(move || {
        hypmirror_verify::verify_file(&path, Md5Hasher::new(), &expected).is_ok()
    })
    .await
    .unwrap_or(false)
}

async fn hash_prefix(path: &Path, hasher: &mut Md5Hasher) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path() {
        let dest = Path::new("/mirror/abc/game.zip");
        assert_eq!(staging_path(dest), PathBuf::from("/mirror/abc/game.zip.part"));
    }
}
