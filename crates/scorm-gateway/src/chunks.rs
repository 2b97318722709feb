//! Chunked upload sessions and reassembly
//!
//! Chunks for a file are written to `<temp_dir>/<file_name>/chunk-<index>`.
//! Each file name has one session moving through `Open -> Finalizing ->
//! Closed`. Chunk writes and the start/end of finalization take the session
//! lock, so a chunk never lands in a directory that is being merged.

use crate::{ApiError, ErrorCode};
use bytes::Bytes;
use dashmap::DashMap;
use scorm_storage::path::validate_segment;
use scorm_storage::{ObjectKey, StorageAdapter, StoredFile};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// File name prefix of a stored chunk
pub const CHUNK_PREFIX: &str = "chunk-";

/// Default upper bound on `totalChunks`
pub const DEFAULT_MAX_CHUNKS: u32 = 10_000;

const STAGING_SUFFIX: &str = ".part";

/// Missing indices listed in an incomplete-upload error
const MISSING_PREVIEW: usize = 10;

/// Lifecycle of a chunked upload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting chunks
    Open,
    /// Chunks are being merged and stored
    Finalizing,
    /// Completed or abandoned; no longer usable
    Closed,
}

/// Chunked upload state for one file name
#[derive(Debug)]
pub struct ChunkSession {
    /// Chunk count announced by the client
    pub total_chunks: Option<u32>,
    /// Indices received by this process
    pub received: BTreeSet<u32>,
    /// Current state
    pub state: SessionState,
}

impl ChunkSession {
    fn new() -> Self {
        Self {
            total_chunks: None,
            received: BTreeSet::new(),
            state: SessionState::Open,
        }
    }
}

/// Result of storing one chunk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkReceipt {
    pub index: u32,
    pub total_chunks: u32,
    pub received: usize,
}

/// A merged file ready to be handed to storage
#[derive(Clone, Debug)]
pub struct AssembledFile {
    pub path: PathBuf,
    pub size: u64,
    pub chunk_count: usize,
}

/// Manager for chunked uploads
pub struct ChunkManager {
    /// Active sessions (file name -> session)
    sessions: DashMap<String, Arc<Mutex<ChunkSession>>>,
    /// Directory holding per-file chunk directories
    temp_dir: PathBuf,
    /// Directory receiving merged files
    uploads_dir: PathBuf,
    /// Largest accepted `totalChunks`
    max_chunks: u32,
}

impl ChunkManager {
    /// Create a new manager
    pub fn new(temp_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: DashMap::new(),
            temp_dir: temp_dir.into(),
            uploads_dir: uploads_dir.into(),
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    /// Set the largest accepted chunk count
    pub fn with_max_chunks(mut self, max_chunks: u32) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Directory holding the chunks of a file
    pub fn chunk_dir(&self, file_name: &str) -> PathBuf {
        self.temp_dir.join(file_name)
    }

    /// Location of a single chunk
    pub fn chunk_path(&self, file_name: &str, index: u32) -> PathBuf {
        self.chunk_dir(file_name).join(format!("{}{}", CHUNK_PREFIX, index))
    }

    /// Location of the merged file
    pub fn merged_path(&self, file_name: &str) -> PathBuf {
        self.uploads_dir.join(file_name)
    }

    /// Number of tracked sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// State of the session for a file, if one is tracked
    pub async fn session_state(&self, file_name: &str) -> Option<SessionState> {
        let session = self.sessions.get(file_name).map(|s| Arc::clone(s.value()))?;
        let state = session.lock().await.state;
        Some(state)
    }

    fn session(&self, file_name: &str) -> Arc<Mutex<ChunkSession>> {
        let entry = self
            .sessions
            .entry(file_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ChunkSession::new())));
        Arc::clone(entry.value())
    }

    fn forget(&self, file_name: &str, session: &Arc<Mutex<ChunkSession>>) {
        self.sessions
            .remove_if(file_name, |_, current| Arc::ptr_eq(current, session));
    }

    /// Persist one chunk of a file
    pub async fn store_chunk(
        &self,
        file_name: &str,
        index: u32,
        total_chunks: u32,
        data: Bytes,
    ) -> Result<ChunkReceipt, ApiError> {
        validate_file_name(file_name)?;
        if total_chunks == 0 {
            return Err(ApiError::new(
                ErrorCode::InvalidArgument,
                "totalChunks must be at least 1",
            ));
        }
        if total_chunks > self.max_chunks {
            return Err(ApiError::new(
                ErrorCode::InvalidArgument,
                format!(
                    "totalChunks {} exceeds the limit of {}",
                    total_chunks, self.max_chunks
                ),
            ));
        }
        if index >= total_chunks {
            return Err(ApiError::new(
                ErrorCode::InvalidArgument,
                format!("chunkIndex {} is out of range for {} chunks", index, total_chunks),
            ));
        }

        loop {
            let session = self.session(file_name);
            let mut guard = session.lock().await;

            match guard.state {
                // Finished sessions are dropped from the map before unlocking,
                // so the next lookup yields a fresh one
                SessionState::Closed => continue,
                SessionState::Finalizing => {
                    return Err(ApiError::new(
                        ErrorCode::UploadInProgress,
                        format!("'{}' is being finalized", file_name),
                    ));
                }
                SessionState::Open => {}
            }

            if let Some(expected) = guard.total_chunks {
                if expected != total_chunks {
                    return Err(ApiError::new(
                        ErrorCode::InvalidArgument,
                        format!(
                            "totalChunks {} does not match {} from earlier chunks",
                            total_chunks, expected
                        ),
                    ));
                }
            }

            let dir = self.chunk_dir(file_name);
            fs::create_dir_all(&dir).await?;

            let dest = self.chunk_path(file_name, index);
            let staging = dir.join(format!("{}{}{}", CHUNK_PREFIX, index, STAGING_SUFFIX));
            fs::write(&staging, &data).await?;
            fs::rename(&staging, &dest).await?;

            if !guard.received.insert(index) {
                debug!(file_name, index, "Chunk overwritten");
            }
            guard.total_chunks = Some(total_chunks);

            debug!(
                file_name,
                index,
                total_chunks,
                size = data.len(),
                received = guard.received.len(),
                "Stored chunk"
            );

            return Ok(ChunkReceipt {
                index,
                total_chunks,
                received: guard.received.len(),
            });
        }
    }

    /// Merge the chunks of a file and hand the result to storage
    ///
    /// On success the merged file is removed. When storage fails the merged
    /// file is left in `uploads_dir` and the session is closed.
    pub async fn complete<S>(
        &self,
        file_name: &str,
        key: &ObjectKey,
        storage: &S,
    ) -> Result<StoredFile, ApiError>
    where
        S: StorageAdapter + ?Sized,
    {
        validate_file_name(file_name)?;

        let session = self.session(file_name);
        let expected_total = {
            let mut guard = session.lock().await;
            match guard.state {
                SessionState::Finalizing => {
                    return Err(ApiError::new(
                        ErrorCode::UploadInProgress,
                        format!("'{}' is already being finalized", file_name),
                    ));
                }
                SessionState::Closed => {
                    return Err(ApiError::new(
                        ErrorCode::NoSuchUpload,
                        format!("'{}' has already been completed", file_name),
                    ));
                }
                SessionState::Open => guard.state = SessionState::Finalizing,
            }
            guard.total_chunks
        };

        let assembled = match self.assemble(file_name, expected_total).await {
            Ok(assembled) => assembled,
            Err(e) => {
                let mut guard = session.lock().await;
                match e.error_code() {
                    // Nothing was consumed; the client can fill the gaps and retry
                    ErrorCode::IncompleteUpload | ErrorCode::InvalidChunk => {
                        guard.state = SessionState::Open;
                    }
                    _ => {
                        guard.state = SessionState::Closed;
                        self.forget(file_name, &session);
                    }
                }
                return Err(e);
            }
        };

        info!(
            file_name,
            size = assembled.size,
            chunks = assembled.chunk_count,
            "Chunks merged"
        );

        let stored = storage.put_file(key, &assembled.path).await;

        {
            let mut guard = session.lock().await;
            guard.state = SessionState::Closed;
            self.forget(file_name, &session);
        }

        match stored {
            Ok(stored) => {
                if let Err(e) = fs::remove_file(&assembled.path).await {
                    warn!(path = %assembled.path.display(), error = %e, "Failed to remove merged file");
                }
                Ok(stored)
            }
            Err(e) => {
                warn!(
                    path = %assembled.path.display(),
                    error = %e,
                    "Storage rejected merged file, leaving it in place"
                );
                Err(ApiError::storage(ErrorCode::UploadFailed, e))
            }
        }
    }

    /// Concatenate chunks in index order into the merged file
    async fn assemble(
        &self,
        file_name: &str,
        expected_total: Option<u32>,
    ) -> Result<AssembledFile, ApiError> {
        let dir = self.chunk_dir(file_name);
        let chunks = list_chunks(&dir).await?;

        if chunks.is_empty() {
            return Err(no_chunks(file_name));
        }

        if let Some((index, _)) = chunks.last().filter(|(index, _)| *index >= self.max_chunks) {
            return Err(ApiError::new(
                ErrorCode::InvalidChunk,
                format!("chunk index {} exceeds the limit of {}", index, self.max_chunks),
            ));
        }

        if let Some(missing) = MissingChunks::find(&chunks, expected_total) {
            return Err(ApiError::new(
                ErrorCode::IncompleteUpload,
                missing.to_string(),
            ));
        }

        fs::create_dir_all(&self.uploads_dir).await?;
        let merged_path = self.merged_path(file_name);
        let mut output = fs::File::create(&merged_path).await?;

        let mut size = 0;
        for (index, path) in &chunks {
            let mut input = fs::File::open(path).await?;
            size += tokio::io::copy(&mut input, &mut output).await?;
            drop(input);
            fs::remove_file(path).await?;
            debug!(file_name, index, "Appended chunk");
        }
        output.flush().await?;

        if let Err(e) = fs::remove_dir(&dir).await {
            warn!(dir = %dir.display(), error = %e, "Failed to remove chunk directory");
        }

        Ok(AssembledFile {
            path: merged_path,
            size,
            chunk_count: chunks.len(),
        })
    }
}

fn validate_file_name(file_name: &str) -> Result<(), ApiError> {
    validate_segment(file_name)
        .map(|_| ())
        .map_err(|e| ApiError::new(ErrorCode::InvalidName, e.to_string()))
}

fn no_chunks(file_name: &str) -> ApiError {
    ApiError::new(
        ErrorCode::NoSuchUpload,
        format!("no chunks found for '{}'", file_name),
    )
}

/// Parse the index out of a chunk file name
pub fn parse_chunk_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(CHUNK_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Leading zeros would give one index two file names
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// List the chunks in a directory, sorted by numeric index
async fn list_chunks(dir: &Path) -> Result<Vec<(u32, PathBuf)>, ApiError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut chunks = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(STAGING_SUFFIX) {
            warn!(chunk = %name, "Ignoring partially written chunk");
            continue;
        }
        let index = parse_chunk_index(&name).ok_or_else(|| {
            ApiError::new(
                ErrorCode::InvalidChunk,
                format!("unexpected chunk file '{}'", name),
            )
        })?;
        chunks.push((index, entry.path()));
    }

    chunks.sort_by_key(|(index, _)| *index);
    Ok(chunks)
}

/// Gaps in a sorted chunk list
#[derive(Debug, PartialEq, Eq)]
struct MissingChunks {
    count: u64,
    first: Vec<u32>,
}

impl MissingChunks {
    fn find(chunks: &[(u32, PathBuf)], expected_total: Option<u32>) -> Option<Self> {
        let highest = chunks.last().map_or(0, |(index, _)| u64::from(*index) + 1);
        let total = expected_total.map_or(highest, |t| u64::from(t).max(highest));
        let present: BTreeSet<u32> = chunks.iter().map(|(index, _)| *index).collect();

        let count = total - present.len() as u64;
        if count == 0 {
            return None;
        }

        let first = (0..total)
            .filter_map(|i| u32::try_from(i).ok())
            .filter(|i| !present.contains(i))
            .take(MISSING_PREVIEW)
            .collect();
        Some(Self { count, first })
    }
}

impl std::fmt::Display for MissingChunks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing {} chunks, first {:?}", self.count, self.first)?;
        if self.count > self.first.len() as u64 {
            write!(f, " and more")?;
        }
        Ok(())
    }
}
