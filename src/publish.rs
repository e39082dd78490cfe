//! Upload of report artifacts to S3.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Content type for an artifact file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Object key of `path` under `prefix`. A `.gz` suffix is added when gzipped.
pub fn object_key(prefix: &str, path: &Path, gzip: bool) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("artifact path {} has no file name", path.display()))?;
    let prefix = prefix.trim_matches('/');
    let key = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    };
    Ok(if gzip { format!("{key}.gz") } else { key })
}

/// Gzip-compresses `bytes` with the default level.
pub fn gzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Uploads each file in `paths` to `bucket` under `prefix`, optionally
/// gzip-compressing them first.
#[tracing::instrument(skip(client, paths), fields(files = paths.len()))]
pub async fn upload_artifacts(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    paths: &[impl AsRef<Path>],
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;

    for path in paths {
        let path = path.as_ref();
        let contents = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let body = if gzip { gzip_bytes(&contents)? } else { contents };
        let key = object_key(prefix, path, gzip)?;

        let mut request = client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .content_type(content_type(path))
            .body(ByteStream::from(body));
        if gzip {
            request = request.content_encoding("gzip");
        }
        request
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for s3://{bucket}/{key}"))?;

        debug!(key = %key, "Uploaded artifact");
        upload_count += 1;
    }

    info!(upload_count, bucket, prefix, "S3 upload complete");
    Ok(upload_count)
}
