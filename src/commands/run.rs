use std::time::Duration;

use crate::auth::{CredentialStore, SessionRefreshScheduler};
use crate::context::AppContext;
use crate::error::AppResult;

/// How often the credential file is polled for writes made by another
/// process (a login or logout from a second terminal).
const CREDENTIAL_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let scheduler = SessionRefreshScheduler::with_failure_handler(
        ctx.credential_store.clone(),
        ctx.auth_backend.clone(),
        ctx.api_client.clone(),
        |err| eprintln!("session refresh failed: {err}"),
    );

    scheduler.start()?;
    if ctx.credential_store.access_token()?.is_none() {
        eprintln!(
            "{}: no stored credentials yet; waiting for a login",
            ctx.profile
        );
    }

    let store_watcher = scheduler.spawn_store_watcher();
    let file_watcher = ctx.credential_store.spawn_watcher(CREDENTIAL_POLL_INTERVAL);

    eprintln!("{}: session watcher running, ctrl-c to stop", ctx.profile);
    tokio::signal::ctrl_c().await?;

    scheduler.cancel_scheduled_refresh();
    store_watcher.abort();
    file_watcher.abort();

    Ok(())
}
