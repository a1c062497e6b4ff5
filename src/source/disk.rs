//! Block device size discovery.
//!
//! `stat` reports zero bytes for a block device. Sizes are tried in order:
//! the `BLKGETSIZE64` ioctl (Linux), seeking to the end of the handle, and
//! finally the filesystem accounting printed by `df --all`.

use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;
use std::process::Command;

/// Size of the block device behind `file` in bytes
pub fn block_device_size(file: &File, path: &Path) -> io::Result<u64> {
    match ioctl_size(file) {
        Ok(size) if size > 0 => return Ok(size),
        Ok(_) => {}
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "BLKGETSIZE64 failed"),
    }

    match seek_end_size(file) {
        Ok(size) if size > 0 => return Ok(size),
        Ok(_) => {}
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "Seek to end failed"),
    }

    df_size(path)
}

#[cfg(target_os = "linux")]
fn ioctl_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    const BLKGETSIZE64: u64 = 0x8008_1272;

    let mut size: u64 = 0;
    let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };

    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(size)
    }
}

#[cfg(not(target_os = "linux"))]
fn ioctl_size(_file: &File) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "BLKGETSIZE64 is Linux only",
    ))
}

fn seek_end_size(file: &File) -> io::Result<u64> {
    let mut handle = file;
    let size = handle.seek(SeekFrom::End(0))?;
    handle.seek(SeekFrom::Start(0))?;
    Ok(size)
}

fn df_size(path: &Path) -> io::Result<u64> {
    let output = Command::new("df").arg("--all").output()?;
    let text = String::from_utf8_lossy(&output.stdout);

    parse_df_output(&text, &path.to_string_lossy()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no size found for {} in df output", path.display()),
        )
    })
}

/// Find `device` in `df` output and return its 1K-block count in bytes.
pub(crate) fn parse_df_output(output: &str, device: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != device {
            return None;
        }
        let blocks: u64 = fields.next()?.parse().ok()?;
        Some(blocks * 1024)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DF: &str = "\
Filesystem     1K-blocks     Used Available Use% Mounted on
sysfs                  0        0         0    - /sys
/dev/sda2      479596200 81234564 373933724  18% /
/dev/sdb1       15623168  1048576  14574592   7% /media/usb
";

    #[test]
    fn df_reports_blocks_in_bytes() {
        assert_eq!(parse_df_output(DF, "/dev/sdb1"), Some(15_623_168 * 1024));
        assert_eq!(parse_df_output(DF, "/dev/sda2"), Some(479_596_200 * 1024));
    }

    #[test]
    fn df_unknown_device() {
        assert_eq!(parse_df_output(DF, "/dev/sdc1"), None);
        assert_eq!(parse_df_output("", "/dev/sdb1"), None);
    }

    #[test]
    fn df_device_must_match_whole_field() {
        assert_eq!(parse_df_output(DF, "/dev/sdb"), None);
    }

    #[test]
    fn seek_end_matches_file_length() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; 4321]).unwrap();
        let file = File::open(tmp.path()).unwrap();
        assert_eq!(seek_end_size(&file).unwrap(), 4321);
    }
}
