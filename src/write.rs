use std::path::Path;

use tracing::{info, instrument};

use crate::error::WriteError;
use crate::process::pivot::WideTable;

/// Replace whatever is at `dest` with the table, one `\n`-terminated line
/// per table line.
#[instrument(level = "info", skip_all, fields(dest = %dest.as_ref().display()))]
pub async fn write_table<P: AsRef<Path>>(table: &WideTable, dest: P) -> Result<(), WriteError> {
    let dest = dest.as_ref();
    info!("printing table to {}", dest.display());

    tokio::fs::write(dest, table.to_string())
        .await
        .map_err(|source| WriteError {
            path: dest.to_path_buf(),
            source,
        })?;

    info!("table written ({} lines)", table.lines().len());
    Ok(())
}
