use anyhow::Result;

/// Every mutation of the ledger happens on one thread, driven by the session event loop.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
