//! Publisher upload flow: diff, upload missing chunks, finalize.

use crate::api_client::{ApiClient, FinalizeResponse};
use crate::chunker::read_chunk;
use crate::error::ClientResult;
use depot_core::manifest::Manifest;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Push a locally chunked build to the server.
///
/// Asks the server which chunk hashes it is missing and uploads only those,
/// re-reading each chunk's bytes from the tree at its recorded offset. The
/// server verifies every chunk hash again on receipt.
pub async fn publish_build(
    client: &ApiClient,
    build_id: i64,
    manifest: &Manifest,
    root: &Path,
) -> ClientResult<FinalizeResponse> {
    // First occurrence of each hash is where we re-read its bytes from.
    let mut locations: HashMap<String, (&str, u64, u64)> = HashMap::new();
    for file in &manifest.files {
        for chunk in &file.chunks {
            locations
                .entry(chunk.hash.to_hex())
                .or_insert((&file.path, chunk.offset, chunk.size));
        }
    }

    let hashes: Vec<String> = manifest
        .distinct_chunk_hashes()
        .iter()
        .map(|h| h.to_hex())
        .collect();

    let missing: HashSet<String> = client
        .missing_chunks(build_id, &hashes)
        .await?
        .into_iter()
        .collect();

    tracing::info!(
        total = hashes.len(),
        missing = missing.len(),
        "chunk diff complete"
    );

    for hash in &hashes {
        if !missing.contains(hash) {
            continue;
        }
        let (path, offset, size) = locations[hash];
        let data = read_chunk(root, path, offset, size)?;
        client.upload_chunk(hash, data).await?;
        tracing::debug!(chunk = %hash, size, "chunk uploaded");
    }

    let finalized = client.finalize_build(build_id, manifest).await?;
    tracing::info!(
        build_id,
        manifest_url = %finalized.manifest_url,
        submission_id = finalized.submission_id,
        "build finalized"
    );
    Ok(finalized)
}
