//! Local build-tree chunking and manifest assembly.

use crate::error::{ClientError, ClientResult};
use depot_core::chunk::{ChunkHash, ChunkRef};
use depot_core::coords::BuildCoords;
use depot_core::hash::ContentHash;
use depot_core::manifest::{FileEntry, Manifest};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Walk a build tree and assemble its manifest.
///
/// Files are visited in sorted path order so the same tree always produces
/// the same manifest. Each file is streamed once: chunk hashes and the
/// whole-file hash are computed in a single pass.
pub fn build_manifest(
    root: &Path,
    coords: &BuildCoords,
    chunk_size: u64,
) -> ClientResult<Manifest> {
    let mut paths = collect_files(root)?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    let mut total_size = 0u64;

    for path in paths {
        let rel = path
            .strip_prefix(root)
            .map_err(|_| ClientError::UnsafePath(path.display().to_string()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let entry = chunk_file(&path, &rel, chunk_size)?;
        total_size += entry.size;
        files.push(entry);
    }

    Ok(Manifest {
        app: coords.slug.to_string(),
        version: coords.version.to_string(),
        platform: coords.platform.to_string(),
        channel: coords.channel.to_string(),
        total_size,
        files,
        chunk_base: "/v1/chunks/".to_string(),
        signature: None,
    })
}

/// Recursively collect regular files under a root.
fn collect_files(root: &Path) -> ClientResult<Vec<PathBuf>> {
    let mut results = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                results.push(entry.path());
            }
            // Symlinks are skipped; a build tree must be self-contained.
        }
    }

    Ok(results)
}

/// Stream one file, producing its entry with contiguous chunk refs.
fn chunk_file(path: &Path, rel_path: &str, chunk_size: u64) -> ClientResult<FileEntry> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; chunk_size as usize];
    let mut file_hasher = ContentHash::hasher();
    let mut chunks = Vec::new();
    let mut offset = 0u64;

    loop {
        let n = read_full(&mut file, &mut buf)?;
        if n == 0 {
            break;
        }
        let window = &buf[..n];
        file_hasher.update(window);
        chunks.push(ChunkRef::new(
            offset,
            n as u64,
            ChunkHash::compute(window),
        ));
        offset += n as u64;
    }

    Ok(FileEntry {
        path: rel_path.to_string(),
        size: offset,
        hash: file_hasher.finalize(),
        chunks,
    })
}

/// Read until the buffer is full or EOF; plain `read` may return short.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Re-read one chunk's bytes from the tree for upload.
pub fn read_chunk(root: &Path, rel_path: &str, offset: u64, size: u64) -> ClientResult<Vec<u8>> {
    use std::io::{Seek, SeekFrom};

    let mut file = File::open(root.join(rel_path))?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; size as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}
