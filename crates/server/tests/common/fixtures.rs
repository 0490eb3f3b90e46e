//! Test fixtures: small build trees and manifests.

use depot_core::chunk::{ChunkHash, chunk_refs};
use depot_core::hash::ContentHash;
use depot_core::manifest::{FileEntry, Manifest};
use std::collections::HashMap;

/// Chunk size used by fixture manifests; small so files span several chunks.
#[allow(dead_code)]
pub const TEST_CHUNK_SIZE: u64 = 64;

/// A small deterministic build tree.
#[allow(dead_code)]
pub fn test_build_tree() -> Vec<(String, Vec<u8>)> {
    vec![
        ("bin/game".to_string(), vec![0xAB; 200]),
        ("data/pak0.dat".to_string(), (0u8..=255).cycle().take(130).collect()),
        ("readme.txt".to_string(), b"hello from the fixture tree\n".to_vec()),
    ]
}

/// Build a manifest plus the chunk bytes backing it.
#[allow(dead_code)]
pub fn build_manifest(
    files: &[(String, Vec<u8>)],
    slug: &str,
    version: &str,
    platform: &str,
    channel: &str,
) -> (Manifest, HashMap<String, Vec<u8>>) {
    let mut entries = Vec::new();
    let mut chunk_data = HashMap::new();
    let mut total_size = 0u64;

    for (path, data) in files {
        let refs = chunk_refs(data, TEST_CHUNK_SIZE);
        for r in &refs {
            let bytes = data[r.offset as usize..(r.offset + r.size) as usize].to_vec();
            chunk_data.insert(r.hash.to_hex(), bytes);
        }
        total_size += data.len() as u64;
        entries.push(FileEntry {
            path: path.clone(),
            size: data.len() as u64,
            hash: ContentHash::compute(data),
            chunks: refs,
        });
    }

    let manifest = Manifest {
        app: slug.to_string(),
        version: version.to_string(),
        platform: platform.to_string(),
        channel: channel.to_string(),
        total_size,
        files: entries,
        chunk_base: "/v1/chunks/".to_string(),
        signature: None,
    };

    (manifest, chunk_data)
}

/// All distinct chunk hashes in a manifest, hex-encoded.
#[allow(dead_code)]
pub fn manifest_hashes(manifest: &Manifest) -> Vec<String> {
    manifest
        .distinct_chunk_hashes()
        .iter()
        .map(ChunkHash::to_hex)
        .collect()
}
