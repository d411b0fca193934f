//! Firmware images and their MD5 digest
//!
//! The digest sent in `x-MD5` is always computed over the exact bytes that
//! go out in the response body. An optional [`DigestCache`] skips the hash
//! when the file has not changed since it was last sent.
//!
//! The cache key is a [`FileStamp`]. On Unix it includes the inode change
//! time, which a publisher cannot set, so `cp -p` or `rsync -t` replacing a
//! file with an identical mtime and length still misses. Elsewhere only
//! mtime and length are available and such a publisher defeats the cache.
//! Stamps younger than the settle window are never trusted, since two
//! writes inside one timestamp tick produce equal stamps.

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use tokio::io::AsyncReadExt;

/// Lowercase hex MD5 of `data`
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// A firmware binary read from the binary store, ready to send
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    /// Base name used in `Content-Disposition`
    pub file_name: String,
    pub bytes: Bytes,
    /// Lowercase hex MD5 of `bytes`
    pub md5: String,
}

impl FirmwareImage {
    /// Read `path` and compute (or reuse) its digest
    ///
    /// The file is opened once. The cache is only consulted when the stamp
    /// taken before the read matches the one taken after it and the number
    /// of bytes read; anything else means the file moved under us and the
    /// digest is recomputed from the bytes actually read.
    pub async fn load(path: &Path, cache: Option<&DigestCache>) -> std::io::Result<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        let before = FileStamp::of(&file.metadata().await?);

        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        let bytes = Bytes::from(data);

        let after = FileStamp::of(&file.metadata().await?);

        let md5 = match (cache, before, after) {
            (Some(cache), Some(before), Some(after))
                if before == after
                    && after.len == bytes.len() as u64
                    && cache.is_settled(&after) =>
            {
                match cache.get(path, &after) {
                    Some(md5) => md5,
                    None => {
                        let md5 = md5_hex(&bytes);
                        cache.insert(path, after, md5.clone());
                        md5
                    }
                }
            }
            _ => md5_hex(&bytes),
        };

        Ok(Self {
            file_name: base_name(path),
            bytes,
            md5,
        })
    }
}

/// File name without any directory component
fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Identity of one version of a file's contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    modified: SystemTime,
    len: u64,
    #[cfg(unix)]
    inode: (u64, u64),
    #[cfg(unix)]
    changed: SystemTime,
}

impl FileStamp {
    /// `None` when the platform reports no modification time
    pub fn of(metadata: &Metadata) -> Option<Self> {
        #[cfg(unix)]
        use std::os::unix::fs::MetadataExt;

        Some(Self {
            modified: metadata.modified().ok()?,
            len: metadata.len(),
            #[cfg(unix)]
            inode: (metadata.dev(), metadata.ino()),
            #[cfg(unix)]
            changed: {
                let secs = u64::try_from(metadata.ctime()).ok()?;
                let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
                SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
            },
        })
    }

    /// Most recent timestamp the filesystem recorded for this file
    fn latest(&self) -> SystemTime {
        #[cfg(unix)]
        {
            self.modified.max(self.changed)
        }
        #[cfg(not(unix))]
        {
            self.modified
        }
    }
}

/// Default age a stamp must reach before it is trusted
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_secs(2);

/// Digest cache keyed by file path, validated by [`FileStamp`]
#[derive(Debug)]
pub struct DigestCache {
    entries: RwLock<HashMap<PathBuf, (FileStamp, String)>>,
    settle_window: Duration,
}

impl Default for DigestCache {
    fn default() -> Self {
        Self::with_settle_window(DEFAULT_SETTLE_WINDOW)
    }
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle_window(settle_window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            settle_window,
        }
    }

    /// Whether `stamp` is old enough that a later write would change it
    fn is_settled(&self, stamp: &FileStamp) -> bool {
        match SystemTime::now().duration_since(stamp.latest()) {
            Ok(age) => age >= self.settle_window,
            // Stamp ahead of the clock; only a zero window accepts it
            Err(_) => self.settle_window.is_zero(),
        }
    }

    /// Cached digest if the file still carries `stamp`
    pub fn get(&self, path: &Path, stamp: &FileStamp) -> Option<String> {
        self.entries
            .read()
            .get(path)
            .filter(|(cached, _)| cached == stamp)
            .map(|(_, md5)| md5.clone())
    }

    pub fn insert(&self, path: &Path, stamp: FileStamp, md5: String) {
        self.entries.write().insert(path.to_path_buf(), (stamp, md5));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
