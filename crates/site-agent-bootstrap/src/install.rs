//! Temp-then-rename atomic file installation.
//!
//! Every credential write goes through [`atomic_write`]: write to a sibling
//! temp path, `fsync`, `rename` into place. A reader can never observe a
//! partially-written cert file, because `rename(2)` within the same
//! filesystem is atomic.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use site_agent_core::{SiteAgentError, SiteAgentResult};

pub fn atomic_write(path: &Path, contents: &[u8], mode: u32) -> SiteAgentResult<()> {
    let dir = path.parent().ok_or_else(|| {
        SiteAgentError::Config(format!("credential path {} has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(dir)
        .map_err(|e| SiteAgentError::Config(format!("failed to create {}: {e}", dir.display())))?;

    let tmp_path: PathBuf = dir.join(format!(
        ".tmp-{}-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("cred"),
        std::process::id()
    ));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(&tmp_path)
        .map_err(|e| SiteAgentError::Config(format!("failed to open {}: {e}", tmp_path.display())))?;

    file.write_all(contents)
        .map_err(|e| SiteAgentError::Config(format!("failed to write {}: {e}", tmp_path.display())))?;
    file.sync_all()
        .map_err(|e| SiteAgentError::Config(format!("failed to fsync {}: {e}", tmp_path.display())))?;

    std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| SiteAgentError::Config(format!("failed to chmod {}: {e}", tmp_path.display())))?;

    std::fs::rename(&tmp_path, path)
        .map_err(|e| SiteAgentError::Config(format!("failed to rename into {}: {e}", path.display())))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("certs").join("client.crt");
        atomic_write(&target, b"-----BEGIN CERTIFICATE-----", 0o600).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"-----BEGIN CERTIFICATE-----");

        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
