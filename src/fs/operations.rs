use std::path::Path;

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Replaces the contents of `path` while holding an exclusive lock, so a second running session
/// exporting to the same file can't interleave with this one.
pub async fn write_locked(path: &Path, contents: &[u8]) -> Result<()> {
    debug!("Writing {} bytes into {path:?}", contents.len());
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;

    file.lock_exclusive()?;
    let result = async {
        file.set_len(0).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;
    file.unlock_async().await?;
    Ok(result?)
}

/// Reads the whole file under a shared lock.
pub async fn read_locked(path: &Path) -> Result<String> {
    debug!("Reading {path:?}");
    let mut file = File::open(path).await?;
    file.lock_shared()?;
    let mut contents = String::new();
    let result = file.read_to_string(&mut contents).await;
    file.unlock_async().await?;
    result?;
    Ok(contents)
}
