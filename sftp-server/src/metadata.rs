use std::os::unix::fs::MetadataExt;

use sftp_protocol::{Attrs, Owner, Time, DEFAULT_DIR_PERMISSIONS, DEFAULT_FILE_PERMISSIONS};

/// Build the default ATTRS block for directory listings and STAT, §4.4:
/// `flags = 0x0F`, real size (0 for directories), `uid=gid=0`, the fixed
/// directory/file permission words, and the host's real atime/mtime.
pub fn attrs_for(metadata: &std::fs::Metadata) -> Attrs {
    let size = if metadata.is_dir() { 0 } else { metadata.len() };
    let permissions = if metadata.is_dir() {
        DEFAULT_DIR_PERMISSIONS
    } else {
        DEFAULT_FILE_PERMISSIONS
    };

    Attrs {
        size: Some(size),
        owner: Some(Owner { uid: 0, gid: 0 }),
        permissions: Some(permissions),
        time: Some(Time {
            atime: metadata.atime() as u32,
            mtime: metadata.mtime() as u32,
        }),
    }
}

/// The `ls -l`-shaped long name carried alongside each NAME entry, §4.4.
/// Ownership is always rendered as `owner`/`group`, the jail never exposes
/// real uids/gids to the client, matching `attrs_for`'s fixed `uid=gid=0`.
pub fn long_name(file_name: &str, metadata: &std::fs::Metadata) -> String {
    let kind_and_perms = if metadata.is_dir() {
        "drwxrwxr-x"
    } else {
        "-rw-r--r--"
    };
    let size = if metadata.is_dir() { 0 } else { metadata.len() };
    let mtime = render_mtime(metadata.mtime());

    format!(
        "{} {:>3} {:<8} {:<8} {:>10} {} {}",
        kind_and_perms, 1, "owner", "group", size, mtime, file_name
    )
}

/// `Mon DD HH:MM`, the classic `ls -l` timestamp shape. Falls back to the
/// Unix epoch if the stored mtime can't be represented (it always can on a
/// real filesystem; this only guards against a clock that predates 1970).
fn render_mtime(mtime_unix: i64) -> String {
    let format = time::macros::format_description!("[month repr:short] [day padding:space] [hour]:[minute]");
    time::OffsetDateTime::from_unix_timestamp(mtime_unix)
        .ok()
        .and_then(|t| t.format(format).ok())
        .unwrap_or_else(|| "Jan  1 00:00".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn attrs_for_directory_uses_fixed_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = fs::metadata(dir.path()).unwrap();
        let attrs = attrs_for(&metadata);
        assert_eq!(attrs.size, Some(0));
        assert_eq!(attrs.permissions, Some(DEFAULT_DIR_PERMISSIONS));
    }

    #[test]
    fn attrs_for_file_reports_real_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"hello").unwrap();
        let metadata = fs::metadata(&path).unwrap();
        let attrs = attrs_for(&metadata);
        assert_eq!(attrs.size, Some(5));
        assert_eq!(attrs.permissions, Some(DEFAULT_FILE_PERMISSIONS));
    }

    #[test]
    fn long_name_for_directory_starts_with_d() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = fs::metadata(dir.path()).unwrap();
        let rendered = long_name("sub", &metadata);
        assert!(rendered.starts_with('d'));
        assert!(rendered.ends_with("sub"));
    }
}
