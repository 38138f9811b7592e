//! Symlink-safe recursive deletion.
//!
//! Submitted programs can create arbitrary entries in their workspace,
//! including symlinks pointing outside it. Removal walks the tree through
//! directory file descriptors (`openat`/`fstatat`/`unlinkat`) with
//! `O_NOFOLLOW`, so a link is unlinked and never traversed.

use crate::config::types::{RunnerError, Result};
use std::ffi::{CStr, CString};
use std::fs;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

const DIR_OPEN_FLAGS: libc::c_int =
    libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NOFOLLOW;

fn fs_error(op: &str, what: impl std::fmt::Debug, err: io::Error) -> RunnerError {
    RunnerError::Filesystem(format!("{op} failed for {what:?}: {err}"))
}

fn is_enoent(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOENT)
}

fn open_dir(path: &Path) -> Result<OwnedFd> {
    let path_c = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        RunnerError::Filesystem(format!("Path contains NUL byte: {}", path.display()))
    })?;
    let fd = unsafe { libc::open(path_c.as_ptr(), DIR_OPEN_FLAGS) };
    if fd < 0 {
        return Err(fs_error("open", path, io::Error::last_os_error()));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn open_child_dir(parent: RawFd, name: &CStr) -> io::Result<OwnedFd> {
    let fd = unsafe { libc::openat(parent, name.as_ptr(), DIR_OPEN_FLAGS) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn lstat_at(parent: RawFd, name: &CStr) -> io::Result<libc::stat> {
    let mut st = std::mem::MaybeUninit::<libc::stat>::zeroed();
    let rc = unsafe {
        libc::fstatat(parent, name.as_ptr(), st.as_mut_ptr(), libc::AT_SYMLINK_NOFOLLOW)
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { st.assume_init() })
}

/// Unlink `name` under `parent`; an entry that is already gone counts as removed.
fn unlink_at(parent: RawFd, name: &CStr, flags: libc::c_int) -> Result<()> {
    let rc = unsafe { libc::unlinkat(parent, name.as_ptr(), flags) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if !is_enoent(&err) {
            return Err(fs_error("unlinkat", name, err));
        }
    }
    Ok(())
}

/// Snapshot the entry names of `dir` (without `.` and `..`).
fn list_entries(dir: &OwnedFd) -> Result<Vec<CString>> {
    // fdopendir takes ownership of the descriptor it is given.
    let iter_fd = unsafe { libc::dup(dir.as_raw_fd()) };
    if iter_fd < 0 {
        return Err(fs_error("dup", "directory", io::Error::last_os_error()));
    }
    let stream = unsafe { libc::fdopendir(iter_fd) };
    if stream.is_null() {
        let err = io::Error::last_os_error();
        unsafe {
            libc::close(iter_fd);
        }
        return Err(fs_error("fdopendir", "directory", err));
    }

    let mut names = Vec::new();
    let outcome = loop {
        unsafe {
            *libc::__errno_location() = 0;
        }
        let entry = unsafe { libc::readdir(stream) };
        if entry.is_null() {
            let errno = unsafe { *libc::__errno_location() };
            break if errno == 0 {
                Ok(())
            } else {
                Err(fs_error("readdir", "directory", io::Error::from_raw_os_error(errno)))
            };
        }
        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
        if matches!(name.to_bytes(), b"." | b"..") {
            continue;
        }
        names.push(name.to_owned());
    };
    unsafe {
        libc::closedir(stream);
    }

    outcome.map(|_| names)
}

/// Open a child directory, granting ourselves access first if the
/// submission stripped its permission bits.
fn open_child_dir_forcing(parent: RawFd, name: &CStr) -> Result<OwnedFd> {
    match open_child_dir(parent, name) {
        Ok(fd) => Ok(fd),
        Err(err) if err.raw_os_error() == Some(libc::EACCES) => {
            let rc = unsafe { libc::fchmodat(parent, name.as_ptr(), 0o700, 0) };
            if rc != 0 {
                return Err(fs_error("fchmodat", name, io::Error::last_os_error()));
            }
            open_child_dir(parent, name).map_err(|e| fs_error("openat", name, e))
        }
        Err(err) => Err(fs_error("openat", name, err)),
    }
}

fn empty_dir(dir: &OwnedFd, root_dev: libc::dev_t) -> Result<()> {
    for name in list_entries(dir)? {
        let st = match lstat_at(dir.as_raw_fd(), &name) {
            Ok(st) => st,
            Err(err) if is_enoent(&err) => continue,
            Err(err) => return Err(fs_error("fstatat", &name, err)),
        };

        if st.st_mode & libc::S_IFMT == libc::S_IFDIR {
            if st.st_dev != root_dev {
                return Err(RunnerError::Filesystem(format!(
                    "Refusing to cross filesystem boundary at {:?}",
                    name
                )));
            }
            let child = open_child_dir_forcing(dir.as_raw_fd(), &name)?;
            empty_dir(&child, root_dev)?;
            drop(child);
            unlink_at(dir.as_raw_fd(), &name, libc::AT_REMOVEDIR)?;
        } else {
            unlink_at(dir.as_raw_fd(), &name, 0)?;
        }
    }
    Ok(())
}

/// Remove `path` and everything below it without following symlinks.
/// A missing path is not an error.
pub fn remove_tree_secure(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(fs_error("lstat", path, err)),
    }

    let parent = path.parent().ok_or_else(|| {
        RunnerError::Filesystem(format!("Cannot remove path without parent: {}", path.display()))
    })?;
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let name = path.file_name().ok_or_else(|| {
        RunnerError::Filesystem(format!("Cannot remove path without file name: {}", path.display()))
    })?;
    let name = CString::new(name.as_bytes()).map_err(|_| {
        RunnerError::Filesystem(format!("Path contains NUL byte: {}", path.display()))
    })?;

    let parent_fd = open_dir(parent)?;
    let st = match lstat_at(parent_fd.as_raw_fd(), &name) {
        Ok(st) => st,
        Err(err) if is_enoent(&err) => return Ok(()),
        Err(err) => return Err(fs_error("fstatat", path, err)),
    };

    if st.st_mode & libc::S_IFMT == libc::S_IFDIR {
        let dir = open_child_dir_forcing(parent_fd.as_raw_fd(), &name)?;
        empty_dir(&dir, st.st_dev)?;
        drop(dir);
        unlink_at(parent_fd.as_raw_fd(), &name, libc::AT_REMOVEDIR)
    } else {
        unlink_at(parent_fd.as_raw_fd(), &name, 0)
    }
}
