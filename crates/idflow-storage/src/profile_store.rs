//! Sealed, atomically written profile document on disk.

use idflow_models::Profile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::document::{parse_document, serialize_document};
use crate::error::Result;
use crate::keystore::{LocalKeystore, MasterKeyKeystore};
use crate::paths;

/// Associated data bound into every sealed profile document.
pub const PROFILES_ASSOCIATED_DATA: &[u8] = b"idflow:profiles:v1";

/// Confidential persistence of the profile set.
pub struct ProfileStore {
    path: PathBuf,
    keystore: Arc<dyn LocalKeystore>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>, keystore: Arc<dyn LocalKeystore>) -> Self {
        Self {
            path: path.into(),
            keystore,
        }
    }

    /// Store at `~/.idflow/profiles.json` sealed with the user's master key.
    pub fn open_default() -> Result<Self> {
        let keystore = MasterKeyKeystore::load_default()?;
        Ok(Self::new(paths::profiles_path()?, Arc::new(keystore)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every well-formed profile.
    ///
    /// A missing file is not an error and yields no profiles. Read and
    /// decryption failures are returned to the caller.
    pub async fn load(&self) -> Result<Vec<Profile>> {
        let sealed = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Profile document not found");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let document = self.keystore.open(PROFILES_ASSOCIATED_DATA, &sealed)?;
        let profiles = parse_document(&document)?;

        info!(
            path = %self.path.display(),
            count = profiles.len(),
            "Loaded stored profiles"
        );
        Ok(profiles)
    }

    /// Serialize `profiles` in order and persist them.
    pub async fn save<'a, I>(&self, profiles: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Profile>,
    {
        let document = serialize_document(profiles)?;
        self.save_document(&document).await
    }

    /// Seal an already serialized document and replace the stored file.
    ///
    /// The sealed bytes go to a sibling temp file first and are renamed over the
    /// target, so readers never observe a partial document.
    pub async fn save_document(&self, document: &[u8]) -> Result<()> {
        let sealed = self.keystore.seal(PROFILES_ASSOCIATED_DATA, document)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        write_owner_only(&temp_path, &sealed).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), bytes = sealed.len(), "Saved profile document");
        Ok(())
    }

    /// Move a document that could not be loaded out of the way, so the next
    /// save does not replace it.
    ///
    /// The document is renamed to `<file>.unreadable` (then `.unreadable.1`,
    /// `.unreadable.2`, ...) without replacing earlier copies. Returns the new
    /// path, or `None` when there is no document.
    pub async fn preserve_unreadable(&self) -> Result<Option<PathBuf>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let mut target = self.path.with_extension("json.unreadable");
        let mut suffix = 0u32;
        while tokio::fs::try_exists(&target).await? {
            suffix += 1;
            target = self.path.with_extension(format!("json.unreadable.{suffix}"));
        }

        tokio::fs::rename(&self.path, &target).await?;
        warn!(
            path = %self.path.display(),
            preserved = %target.display(),
            "Moved unreadable profile document aside"
        );
        Ok(Some(target))
    }
}

async fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
