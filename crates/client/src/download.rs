//! Download and install flow: parallel verified fetch, reconstruction,
//! end-to-end verification.

use crate::api_client::ApiClient;
use crate::error::{ClientError, ClientResult};
use bytes::Bytes;
use depot_core::chunk::ChunkHash;
use depot_core::hash::ContentHash;
use depot_core::manifest::{Manifest, normalize_path};
use futures::StreamExt;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default download worker pool size.
pub const DEFAULT_WORKERS: usize = 6;

/// Map a manifest path to a location under the install root.
///
/// The path is normalized (rejecting traversal) before joining; every
/// externally supplied path is treated as untrusted input.
fn safe_output_path(base: &Path, rel_path: &str) -> ClientResult<PathBuf> {
    let normalized =
        normalize_path(rel_path).map_err(|_| ClientError::UnsafePath(rel_path.to_string()))?;
    Ok(base.join(normalized))
}

/// Fetch the manifest for a build and install it under `install_dir`.
///
/// Chunks are fetched with a bounded worker pool and verified individually;
/// each file is then assembled, re-hashed whole, and only renamed into place
/// once the whole-file hash matches. Any verification failure aborts the
/// install; no corrupt file is left at its final path.
pub async fn install(
    client: &ApiClient,
    slug: &str,
    platform: &str,
    channel: &str,
    version: Option<&str>,
    install_dir: &Path,
    workers: usize,
) -> ClientResult<Manifest> {
    let manifest = client
        .get_manifest(slug, platform, channel, version)
        .await?;

    // Never trust a manifest before validating it, even from our own server.
    manifest.validate()?;

    let chunks = fetch_chunks(client, &manifest, workers).await?;
    reconstruct(&manifest, &chunks, install_dir)?;

    tracing::info!(
        app = %manifest.app,
        version = %manifest.version,
        files = manifest.files.len(),
        "install complete"
    );
    Ok(manifest)
}

/// Fetch all distinct chunks with bounded parallelism, verifying each.
async fn fetch_chunks(
    client: &ApiClient,
    manifest: &Manifest,
    workers: usize,
) -> ClientResult<HashMap<String, Bytes>> {
    let hashes = manifest.distinct_chunk_hashes();
    let workers = workers.max(1);

    tracing::info!(chunks = hashes.len(), workers, "fetching chunks");

    let results = futures::stream::iter(hashes.into_iter().map(|hash| {
        let client = client.clone();
        let slug = manifest.app.clone();
        let version = manifest.version.clone();
        let platform = manifest.platform.clone();
        let channel = manifest.channel.clone();
        async move {
            let data = client
                .get_chunk(&hash.to_hex(), &slug, &version, &platform, &channel)
                .await?;
            // Verify before trusting; a flipped byte aborts the operation.
            if ChunkHash::compute(&data) != hash {
                return Err(ClientError::ChunkCorrupt {
                    hash: hash.to_hex(),
                });
            }
            Ok::<_, ClientError>((hash.to_hex(), data))
        }
    }))
    .buffer_unordered(workers)
    .collect::<Vec<_>>()
    .await;

    let mut chunks = HashMap::new();
    for result in results {
        let (hash, data) = result?;
        chunks.insert(hash, data);
    }
    Ok(chunks)
}

/// Assemble files from chunks and verify each whole file end to end.
fn reconstruct(
    manifest: &Manifest,
    chunks: &HashMap<String, Bytes>,
    install_dir: &Path,
) -> ClientResult<()> {
    std::fs::create_dir_all(install_dir)?;

    for file in &manifest.files {
        let out = safe_output_path(install_dir, &file.path)?;
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a partial path, verify, then rename. The end-to-end
        // whole-file hash is checked by re-reading what actually hit disk,
        // independently of the per-chunk checks, so reordering or truncation
        // bugs cannot slip through.
        let partial = out.with_file_name(format!(
            "{}.partial",
            out.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        ));

        {
            let mut dst = std::fs::File::create(&partial)?;
            for chunk in &file.chunks {
                let data = chunks.get(&chunk.hash.to_hex()).ok_or_else(|| {
                    ClientError::InvalidResponse(format!(
                        "manifest references unfetched chunk {}",
                        chunk.hash
                    ))
                })?;
                dst.write_all(data)?;
            }
            dst.flush()?;
        }

        let written = std::fs::read(&partial)?;
        if written.len() as u64 != file.size || ContentHash::compute(&written) != file.hash {
            let _ = std::fs::remove_file(&partial);
            return Err(ClientError::FileCorrupt {
                path: file.path.clone(),
            });
        }

        std::fs::rename(&partial, &out)?;
        tracing::debug!(path = %file.path, size = file.size, "file installed");
    }

    Ok(())
}
