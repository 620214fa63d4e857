/*!
sysfs - Narrow filesystem seam between the engine and the kernel's
pseudo-filesystems.

Every read of `/proc` or `/sys` and the single write to
`/proc/irq/<N>/smp_affinity` goes through this trait rather than `std::fs`
directly, so the balancing engine's decision logic can be exercised against
a fake filesystem view in tests instead of a real kernel (spec §8's
scenarios are literal inputs, not live systems).
*/

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub trait FsView {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// Reads and writes the real kernel pseudo-filesystems.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FsView for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory filesystem view for unit and scenario tests. Both maps live
/// behind `Rc<RefCell<_>>` so a `FakeFs` handle kept by a test and the one
/// handed to an `Engine` refer to the same state: a test can keep mutating
/// `/proc/stat`-style files across ticks without the engine needing to hand
/// its filesystem view back.
#[derive(Debug, Default, Clone)]
pub struct FakeFs {
    files: Rc<RefCell<BTreeMap<PathBuf, String>>>,
    dirs: Rc<RefCell<BTreeMap<PathBuf, Vec<String>>>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>, names: Vec<&str>) -> Self {
        self.dirs
            .borrow_mut()
            .insert(path.into(), names.into_iter().map(String::from).collect());
        self
    }

    pub fn set_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    pub fn written(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }
}

impl FsView for FakeFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>> {
        self.dirs
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path) || self.dirs.borrow().contains_key(path)
    }
}
