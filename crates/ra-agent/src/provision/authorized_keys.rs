//! Authorized keys file updates

use std::fs;
use std::io::Write;
use std::path::Path;

use ra_core::error::CredentialError;

/// Append a public key to an authorized keys file
///
/// The key is written as `\n<key>\n` so it never joins a previous line that
/// lacks a trailing newline. The file is created with mode 0600 and its
/// directory with mode 0700 when missing. Existing entries are never
/// inspected, so repeated runs append duplicates.
pub fn append_authorized_key(path: &Path, key: &str) -> Result<(), CredentialError> {
    let io_err = |source| CredentialError::AuthorizedKeys {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder.create(parent).map_err(io_err)?;
        }
    }

    let mut options = fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(format!("\n{}\n", key).as_bytes())
        .map_err(io_err)?;

    tracing::debug!("Appended public key to {:?}", path);
    Ok(())
}
