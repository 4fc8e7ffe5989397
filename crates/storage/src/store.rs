use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use warehouse_core::{LocationKind, RelativePath, StoreConfig};

use crate::error::StoreError;
use crate::fs::{EntryKind, FileSystem, OsFileSystem};
use crate::paths::{self, Locations};

/// A storage area: one location root plus an optional sub-directory under it.
///
/// Files are written beneath [`PathStore::save_directory_absolute_path`] and
/// handed back as [`RelativePath`]s, which stay valid when the home directory
/// moves between launches.
pub struct PathStore {
    fs: Arc<dyn FileSystem>,
    locations: Arc<Locations>,
    location_kind: LocationKind,
    sub_directory_path: Option<String>,
}

impl PathStore {
    /// A Temporary store with no sub-directory assigned. Touches nothing on disk.
    pub fn new(fs: Arc<dyn FileSystem>, locations: Arc<Locations>) -> Self {
        Self {
            fs,
            locations,
            location_kind: LocationKind::Temporary,
            sub_directory_path: None,
        }
    }

    /// Build a store against injected collaborators and make sure its directory exists.
    pub fn with_env(
        fs: Arc<dyn FileSystem>,
        locations: Arc<Locations>,
        kind: LocationKind,
        sub_directory_path: Option<&str>,
    ) -> Self {
        let mut store = Self::new(fs, locations);
        store.location_kind = kind;
        store.set_sub_directory_path(sub_directory_path);
        store.ensure_directory();
        store
    }

    /// Build a store on the real filesystem under the detected platform roots.
    pub fn configure(kind: LocationKind, sub_directory_path: Option<&str>) -> anyhow::Result<Self> {
        let locations = paths::system()?.clone();
        Ok(Self::with_env(
            Arc::new(OsFileSystem),
            Arc::new(locations),
            kind,
            sub_directory_path,
        ))
    }

    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        Self::configure(config.location, config.sub_directory.as_deref())
    }

    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    pub fn location_kind(&self) -> LocationKind {
        self.location_kind
    }

    pub fn set_location_kind(&mut self, kind: LocationKind) {
        self.location_kind = kind;
    }

    /// `None` only until the first assignment; assigning `None` stores `""`.
    pub fn sub_directory_path(&self) -> Option<&str> {
        self.sub_directory_path.as_deref()
    }

    /// `"notes"` and `"notes/"` both become `"/notes"`.
    pub fn set_sub_directory_path(&mut self, path: Option<&str>) {
        self.sub_directory_path = Some(normalize_sub_directory(path));
    }

    /// Always ends in `/`.
    pub fn save_directory_absolute_path(&self) -> String {
        format!(
            "{}{}/",
            self.locations.root(self.location_kind),
            self.sub_directory_path().unwrap_or_default()
        )
    }

    pub fn ensure_directory(&self) -> bool {
        match create_directory(self.fs.as_ref(), &self.save_directory_absolute_path()) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "could not prepare save directory");
                false
            }
        }
    }

    /// Write `contents` to `file_name` in the background.
    ///
    /// The directory is created first if needed. Resolves to the home-relative
    /// path of the written file. The work is issued before this returns and
    /// finishes even if the future is dropped.
    ///
    /// `contents` takes anything convertible into [`Bytes`] (`Vec<u8>`,
    /// `&'static [u8]`, `String`). A borrowed buffer has to be copied first,
    /// e.g. with [`Bytes::copy_from_slice`].
    pub fn save(
        &self,
        file_name: &str,
        contents: impl Into<Bytes>,
    ) -> impl Future<Output = Result<RelativePath, StoreError>> + Send {
        let job = self.save_job(file_name, contents.into());
        let done = dispatch(move || job.run());
        async move {
            done.await
                .unwrap_or_else(|e| Err(StoreError::BackgroundTaskFailed(e.to_string())))
        }
    }

    /// Callback form of [`PathStore::save`].
    ///
    /// The save is issued before this returns and exactly one of the callbacks
    /// runs once it finishes, on the worker that did the write. Dropping the
    /// returned [`PendingSave`] does not cancel anything. The failure callback
    /// always receives `None`; use [`PathStore::save`] to see why a save failed.
    ///
    /// Inside a tokio runtime the work goes to its blocking pool, otherwise to a
    /// dedicated thread.
    pub fn save_file<S, F>(
        &self,
        file_name: &str,
        contents: impl Into<Bytes>,
        on_success: Option<S>,
        on_failure: Option<F>,
    ) -> PendingSave
    where
        S: FnOnce(Option<RelativePath>) + Send + 'static,
        F: FnOnce(Option<StoreError>) + Send + 'static,
    {
        let job = self.save_job(file_name, contents.into());
        let done = dispatch(move || match job.run() {
            Ok(relative) => {
                if let Some(cb) = on_success {
                    cb(Some(relative));
                }
                true
            }
            Err(err) => {
                warn!(%err, "save failed");
                if let Some(cb) = on_failure {
                    cb(None);
                }
                false
            }
        });
        PendingSave { done }
    }

    fn save_job(&self, file_name: &str, contents: Bytes) -> SaveJob {
        let dir = self.save_directory_absolute_path();
        SaveJob {
            fs: Arc::clone(&self.fs),
            locations: Arc::clone(&self.locations),
            path: format!("{dir}{file_name}"),
            dir,
            contents,
        }
    }

    /// Blocking save on the calling thread.
    ///
    /// Missing `file_name` or `contents` returns `None` without touching the filesystem.
    pub fn save_file_and_wait(
        &self,
        file_name: Option<&str>,
        contents: Option<&[u8]>,
    ) -> Option<RelativePath> {
        let (file_name, contents) = (file_name?, contents?);

        let dir = self.save_directory_absolute_path();
        let path = format!("{dir}{file_name}");
        match write_file(self.fs.as_ref(), &dir, &path, contents) {
            Ok(()) => Some(RelativePath(self.locations.to_relative(&path))),
            Err(err) => {
                warn!(%err, file_name, "save failed");
                None
            }
        }
    }

    pub fn read(&self, relative_path: &str) -> Result<Vec<u8>, StoreError> {
        read_relative(self.fs.as_ref(), &self.locations, relative_path)
    }

    pub fn open_file(&self, relative_path: Option<&str>) -> Option<Vec<u8>> {
        open_relative(self.fs.as_ref(), &self.locations, relative_path?)
    }

    /// True only for an existing regular file; directories report false.
    pub fn file_exists_at_path(&self, relative_path: Option<&str>) -> bool {
        relative_path.is_some_and(|p| is_file_relative(self.fs.as_ref(), &self.locations, p))
    }
}

/// Completion handle for [`PathStore::save_file`].
///
/// By the time it resolves, the callback for the save has already run.
#[derive(Debug)]
pub struct PendingSave {
    done: oneshot::Receiver<bool>,
}

impl PendingSave {
    /// Wait for the save; `true` if it succeeded.
    pub async fn wait(self) -> bool {
        self.done.await.unwrap_or(false)
    }

    /// Blocking form of [`PendingSave::wait`]. Must not be called from async code.
    pub fn blocking_wait(self) -> bool {
        self.done.blocking_recv().unwrap_or(false)
    }
}

/// Everything a background save needs, detached from the store.
struct SaveJob {
    fs: Arc<dyn FileSystem>,
    locations: Arc<Locations>,
    dir: String,
    path: String,
    contents: Bytes,
}

impl SaveJob {
    fn run(self) -> Result<RelativePath, StoreError> {
        write_file(self.fs.as_ref(), &self.dir, &self.path, &self.contents)?;
        Ok(RelativePath(self.locations.to_relative(&self.path)))
    }
}

fn dispatch<T, W>(work: W) -> oneshot::Receiver<T>
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let task = move || {
        let _ = tx.send(work());
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(task);
        }
        Err(_) => {
            thread::spawn(task);
        }
    }
    rx
}

impl std::fmt::Debug for PathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathStore")
            .field("location_kind", &self.location_kind)
            .field("sub_directory_path", &self.sub_directory_path)
            .finish_non_exhaustive()
    }
}

/// Read a previously saved file from the real filesystem.
pub fn open_file(relative_path: Option<&str>) -> Option<Vec<u8>> {
    let relative_path = relative_path?;
    let locations = paths::system_or_warn()?;
    open_relative(&OsFileSystem, locations, relative_path)
}

pub fn file_exists_at_path(relative_path: Option<&str>) -> bool {
    let (Some(relative_path), Some(locations)) = (relative_path, paths::system_or_warn()) else {
        return false;
    };
    is_file_relative(&OsFileSystem, locations, relative_path)
}

fn normalize_sub_directory(path: Option<&str>) -> String {
    let Some(path) = path else {
        return String::new();
    };

    let mut out = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if out.ends_with('/') {
        out.pop();
    }
    out
}

fn create_directory(fs: &dyn FileSystem, dir: &str) -> Result<(), StoreError> {
    let path = Path::new(dir);
    fs.create_dir_all(path)
        .map_err(|source| StoreError::DirectoryCreateFailed {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(dir, "save directory ready");
    Ok(())
}

fn write_file(fs: &dyn FileSystem, dir: &str, file: &str, contents: &[u8]) -> Result<(), StoreError> {
    create_directory(fs, dir)?;

    let path = Path::new(file);
    fs.write(path, contents)
        .map_err(|source| StoreError::FileWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(file, bytes = contents.len(), "file saved");
    Ok(())
}

fn read_relative(
    fs: &dyn FileSystem,
    locations: &Locations,
    relative_path: &str,
) -> Result<Vec<u8>, StoreError> {
    let absolute = locations.to_absolute(relative_path);
    fs.read(Path::new(&absolute))
        .map_err(|source| StoreError::FileReadFailed {
            path: absolute.into(),
            source,
        })
}

fn open_relative(fs: &dyn FileSystem, locations: &Locations, relative_path: &str) -> Option<Vec<u8>> {
    match read_relative(fs, locations, relative_path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            debug!(%err, "open failed");
            None
        }
    }
}

fn is_file_relative(fs: &dyn FileSystem, locations: &Locations, relative_path: &str) -> bool {
    let absolute = locations.to_absolute(relative_path);
    fs.entry_kind(Path::new(&absolute)) == Some(EntryKind::File)
}
