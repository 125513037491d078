//! Caller identity.
//!
//! Anonymous callers are tagged with a locally persisted guest identifier,
//! generated once and reused across sessions. Authenticated callers bypass
//! the store entirely. The store is an injected dependency of the consumer,
//! never process-wide mutable state.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Well-known file name for the persisted guest identifier.
const IDENTITY_FILE: &str = "user_id";

/// Persisted storage for the local caller identifier.
pub trait IdentityStore {
    /// Previously stored identifier, if any.
    fn load(&self) -> Option<String>;

    /// Persist the identifier. Failures are reported but non-fatal: the
    /// caller keeps using the in-memory value for this process.
    fn store(&self, id: &str) -> std::io::Result<()>;
}

/// File-backed store under the platform data directory.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store under `<data_dir>/support-chat/user_id`.
    pub fn new() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("support-chat").join(IDENTITY_FILE),
        }
    }

    /// Store at an explicit location.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let id = contents.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    fn store(&self, id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, id)
    }
}

/// In-memory store; holds nothing across processes. Useful for tests and
/// for consumers that do not want an on-disk identity.
#[derive(Default)]
pub struct MemoryIdentityStore {
    id: std::sync::Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Option<String> {
        self.id.lock().ok()?.clone()
    }

    fn store(&self, id: &str) -> std::io::Result<()> {
        if let Ok(mut slot) = self.id.lock() {
            *slot = Some(id.to_string());
        }
        Ok(())
    }
}

/// Identifier for an authenticated member.
pub fn member_user_id(member_id: impl std::fmt::Display) -> String {
    format!("member_{member_id}")
}

/// Load the persisted guest identifier, generating and storing a fresh
/// `guest_<uuid>` on first use.
pub fn load_or_create_guest_id(store: &dyn IdentityStore) -> String {
    if let Some(id) = store.load() {
        return id;
    }

    let id = format!("guest_{}", uuid::Uuid::new_v4());
    if let Err(e) = store.store(&id) {
        warn!(error = %e, "failed to persist guest id; using it for this process only");
    }
    id
}
