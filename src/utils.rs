//! Filesystem helpers

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Ensure at least `min_free` bytes are available on the filesystem holding `path`
///
/// `path` does not need to exist yet; the closest existing ancestor is
/// queried instead.
pub fn check_free_space(path: &Path, min_free: u64) -> Result<u64> {
    let check_path = nearest_existing_ancestor(path).ok_or_else(|| {
        Error::DiskSpaceCheckFailed(format!(
            "no existing ancestor for '{}'",
            path.display()
        ))
    })?;

    let available = get_available_space(&check_path).map_err(|e| {
        Error::DiskSpaceCheckFailed(format!(
            "failed to check disk space for '{}': {}",
            check_path.display(),
            e
        ))
    })?;

    if available < min_free {
        return Err(Error::InsufficientSpace {
            required: min_free,
            available,
        });
    }

    Ok(available)
}

/// Walk up from `path` until an existing directory (or file) is found
fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    while let Some(candidate) = current {
        let probe = if candidate.as_os_str().is_empty() {
            Path::new(".")
        } else {
            candidate
        };
        if probe.exists() {
            return Some(probe.to_path_buf());
        }
        current = candidate.parent();
    }
    None
}

/// Get available disk space for a given path
///
/// Uses `statvfs` on Unix and `GetDiskFreeSpaceExW` on Windows. Returns the
/// number of bytes available to an unprivileged user.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid NUL-terminated string, stat is zeroed
        // before the call and only read after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            #[allow(clippy::unnecessary_cast)]
            let available_bytes = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
            Ok(available_bytes)
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is NUL-terminated and every out pointer refers to
        // a live, aligned u64 that is only read after a successful call.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut total_bytes: u64 = 0;
            let mut total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut total_bytes as *mut u64 as *mut _,
                &mut total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "disk space checking is not supported on this platform",
        ))
    }
}
