//! Host capability probes

use tracing::debug;

/// Whether this host can run binaries under `arch -arm64`. Only meaningful
/// on macOS; everywhere else the answer is no without probing.
pub async fn has_arm64() -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }
    match tokio::process::Command::new("arch")
        .args(["-arm64", "true"])
        .output()
        .await
    {
        Ok(output) => {
            let available = output.status.success();
            debug!("arm64 architecture emulation available: {available}");
            available
        }
        Err(_) => false,
    }
}
