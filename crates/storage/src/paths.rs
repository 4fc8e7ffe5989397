use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use directories::{BaseDirs, UserDirs};
use warehouse_core::LocationKind;

/// Snapshot of the platform roots a store resolves paths against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    home: PathBuf,
    document: PathBuf,
    cache: PathBuf,
    temporary: PathBuf,
}

impl Locations {
    pub fn new(
        home: impl Into<PathBuf>,
        document: impl Into<PathBuf>,
        cache: impl Into<PathBuf>,
        temporary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            home: home.into(),
            document: document.into(),
            cache: cache.into(),
            temporary: temporary.into(),
        }
    }

    /// Resolve the roots from the host platform.
    ///
    /// Every root is kept under home so that [`Locations::to_relative`] and
    /// [`Locations::to_absolute`] round-trip for files saved in any area. A
    /// platform root that lies elsewhere (Linux `/tmp`, an `XDG_CACHE_HOME` on
    /// another mount) is replaced by a directory inside home, the same layout an
    /// app container uses: `<home>/Documents`, `<home>/.cache`, `<home>/tmp`.
    pub fn detect() -> anyhow::Result<Self> {
        let base = BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("unable to determine home directory"))?;
        let home = base.home_dir().to_path_buf();

        // Headless Linux hosts often have no XDG documents entry.
        let document = UserDirs::new().and_then(|u| u.document_dir().map(Path::to_path_buf));
        let document = under_home(&home, document, "Documents");
        let cache = under_home(&home, Some(base.cache_dir().to_path_buf()), ".cache");
        let temporary = under_home(&home, Some(std::env::temp_dir()), "tmp");

        Ok(Self {
            home,
            document,
            cache,
            temporary,
        })
    }

    pub fn home_directory_path(&self) -> String {
        path_string(&self.home)
    }

    pub fn document_directory_path(&self) -> String {
        path_string(&self.document)
    }

    pub fn cache_directory_path(&self) -> String {
        path_string(&self.cache)
    }

    pub fn temporary_directory_path(&self) -> String {
        let path = path_string(&self.temporary);
        match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => path,
        }
    }

    pub fn root(&self, kind: LocationKind) -> String {
        match kind {
            LocationKind::Document => self.document_directory_path(),
            LocationKind::Cache => self.cache_directory_path(),
            LocationKind::Temporary => self.temporary_directory_path(),
        }
    }

    /// Strip the home prefix so the result survives a moved home directory.
    ///
    /// Paths outside home pass through untouched.
    pub fn to_relative(&self, path: &str) -> String {
        let home = self.home_directory_path();
        match path.strip_prefix(home.as_str()) {
            Some(rest) => rest.to_string(),
            None => path.to_string(),
        }
    }

    /// Inverse of [`Locations::to_relative`]. Paths already under home are returned as-is.
    pub fn to_absolute(&self, path: &str) -> String {
        let home = self.home_directory_path();
        if path.starts_with(home.as_str()) {
            return path.to_string();
        }
        join_component(&home, path)
    }
}

fn under_home(home: &Path, candidate: Option<PathBuf>, fallback: &str) -> PathBuf {
    match candidate {
        Some(path) if path.starts_with(home) && path != home => path,
        _ => home.join(fallback),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Append `component` to `base` the way a path join does: exactly one `/`
/// between segments, repeated separators collapsed, no trailing `/`.
fn join_component(base: &str, component: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(component.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    let joined = segments.join("/");
    if base.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

static SYSTEM: OnceLock<Locations> = OnceLock::new();

/// Platform roots, detected once per process.
///
/// Only a successful detection is cached; after a failure the next call tries again.
pub fn system() -> anyhow::Result<&'static Locations> {
    if let Some(locations) = SYSTEM.get() {
        return Ok(locations);
    }
    let detected = Locations::detect()?;
    Ok(SYSTEM.get_or_init(|| detected))
}

pub fn home_directory_path() -> anyhow::Result<String> {
    Ok(system()?.home_directory_path())
}

pub fn document_directory_path() -> anyhow::Result<String> {
    Ok(system()?.document_directory_path())
}

pub fn cache_directory_path() -> anyhow::Result<String> {
    Ok(system()?.cache_directory_path())
}

pub fn temporary_directory_path() -> anyhow::Result<String> {
    Ok(system()?.temporary_directory_path())
}

/// Home-relative form of `path` against the detected home directory.
///
/// Returns `None` for `None`, and also when the platform roots cannot be
/// detected (a warning is logged).
pub fn to_relative(path: Option<&str>) -> Option<String> {
    let path = path?;
    Some(system_or_warn()?.to_relative(path))
}

pub fn to_absolute(path: Option<&str>) -> Option<String> {
    let path = path?;
    Some(system_or_warn()?.to_absolute(path))
}

pub(crate) fn system_or_warn() -> Option<&'static Locations> {
    match system() {
        Ok(locations) => Some(locations),
        Err(err) => {
            tracing::warn!(%err, "platform directory detection failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Locations {
        Locations::new(
            "/home/ada",
            "/home/ada/Documents",
            "/home/ada/.cache",
            "/tmp/",
        )
    }

    #[test]
    fn temporary_root_has_no_trailing_slash() {
        assert_eq!(fixture().temporary_directory_path(), "/tmp");
        assert_eq!(fixture().root(LocationKind::Temporary), "/tmp");
    }

    #[test]
    fn roots_follow_kind() {
        let l = fixture();
        assert_eq!(l.root(LocationKind::Document), "/home/ada/Documents");
        assert_eq!(l.root(LocationKind::Cache), "/home/ada/.cache");
    }

    #[test]
    fn to_relative_strips_home_prefix() {
        let l = fixture();
        assert_eq!(l.to_relative("/home/ada/Documents/a.txt"), "/Documents/a.txt");
    }

    #[test]
    fn to_relative_leaves_outside_paths_alone() {
        let l = fixture();
        for p in ["/tmp/notes/a.txt", "relative/x", "", "/home/other/a"] {
            assert_eq!(l.to_relative(p), p);
        }
    }

    #[test]
    fn to_absolute_reverses_to_relative() {
        let l = fixture();
        for p in [
            "/home/ada/Documents/a.txt",
            "/home/ada/.cache/thumbs/b.png",
            "/home/ada/x",
        ] {
            assert_eq!(l.to_absolute(&l.to_relative(p)), p);
        }
    }

    #[test]
    fn to_absolute_keeps_paths_already_under_home() {
        let l = fixture();
        assert_eq!(l.to_absolute("/home/ada/a.txt"), "/home/ada/a.txt");
    }

    #[test]
    fn to_absolute_joins_with_one_separator() {
        let l = fixture();
        assert_eq!(l.to_absolute("notes/a.txt"), "/home/ada/notes/a.txt");
        assert_eq!(l.to_absolute("/notes/a.txt"), "/home/ada/notes/a.txt");

        let slashed = Locations::new("/home/ada/", "/d", "/c", "/t");
        assert_eq!(slashed.to_absolute("/notes/a.txt"), "/home/ada/notes/a.txt");
        assert_eq!(slashed.to_absolute("notes/a.txt"), "/home/ada/notes/a.txt");
    }

    #[test]
    fn free_functions_pass_none_through() {
        assert_eq!(to_relative(None), None);
        assert_eq!(to_absolute(None), None);
    }

    #[test]
    fn to_absolute_collapses_repeated_separators() {
        let l = fixture();
        assert_eq!(l.to_absolute("notes//a.txt"), "/home/ada/notes/a.txt");
        assert_eq!(l.to_absolute("//notes///deep//a.txt"), "/home/ada/notes/deep/a.txt");
        assert_eq!(l.to_absolute("notes/"), "/home/ada/notes");
        assert_eq!(l.to_absolute(""), "/home/ada");
    }

    #[test]
    fn roots_outside_home_move_inside_home() {
        let home = Path::new("/home/ada");
        assert_eq!(
            under_home(home, Some(PathBuf::from("/tmp")), "tmp"),
            PathBuf::from("/home/ada/tmp")
        );
        assert_eq!(
            under_home(home, Some(PathBuf::from("/home/adam/.cache")), ".cache"),
            PathBuf::from("/home/ada/.cache")
        );
        assert_eq!(
            under_home(home, Some(PathBuf::from("/home/ada/Library/Caches")), ".cache"),
            PathBuf::from("/home/ada/Library/Caches")
        );
        assert_eq!(
            under_home(home, None, "Documents"),
            PathBuf::from("/home/ada/Documents")
        );
        assert_eq!(
            under_home(home, Some(home.to_path_buf()), "Documents"),
            PathBuf::from("/home/ada/Documents")
        );
    }

    #[test]
    fn detected_roots_round_trip_for_every_kind() {
        let l = Locations::detect().unwrap();
        let home = l.home_directory_path();
        for kind in [LocationKind::Document, LocationKind::Cache, LocationKind::Temporary] {
            let root = l.root(kind);
            assert!(root.starts_with(&home), "{kind} root {root} is outside {home}");

            let file = format!("{root}/notes/a.txt");
            let rel = l.to_relative(&file);
            assert!(!rel.starts_with(&home));
            assert_eq!(l.to_absolute(&rel), file);
        }
    }

    #[test]
    fn system_detection_is_cached() {
        let first = system().unwrap();
        let second = system().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(home_directory_path().unwrap(), first.home_directory_path());
        assert_eq!(temporary_directory_path().unwrap(), first.root(LocationKind::Temporary));
        assert_eq!(document_directory_path().unwrap(), first.root(LocationKind::Document));
        assert_eq!(cache_directory_path().unwrap(), first.root(LocationKind::Cache));
    }

    #[test]
    fn free_functions_translate_against_detected_home() {
        let home = home_directory_path().unwrap();
        let absolute = format!("{home}/tmp/notes/a.txt");

        let rel = to_relative(Some(absolute.as_str())).unwrap();
        assert_eq!(rel, "/tmp/notes/a.txt");
        assert_eq!(to_absolute(Some(rel.as_str())), Some(absolute.clone()));
        assert_eq!(to_absolute(Some(absolute.as_str())), Some(absolute));
        assert_eq!(to_relative(Some("/elsewhere/x")), Some("/elsewhere/x".to_string()));
    }
}
