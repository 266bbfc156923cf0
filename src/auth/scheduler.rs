use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{AppError, AppResult};

use super::backend::AuthBackend;
use super::credential_store::{CredentialKey, CredentialStore};
use super::token;

/// Lead time before expiry at which renewal is triggered.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Minimum spacing between refresh attempts, whatever triggered them.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Short defer used when the token is already inside the buffer (or past
/// expiry). Refreshing on a delay instead of inline breaks refresh loops when
/// the clock or token is stale.
const STALE_TOKEN_DEFER: Duration = Duration::from_secs(1);

type FailureHandler = Box<dyn Fn(&AppError) + Send + Sync>;

/// Keeps the stored access token fresh: decodes its expiry, arms a single
/// timer that fires [`REFRESH_BUFFER`] ahead of it, exchanges the refresh
/// token with the auth backend, and pushes the renewed token into the API
/// client and the credential store.
///
/// Renewal never overlaps (at most one request in flight per scheduler) and
/// never runs more often than [`MIN_REFRESH_INTERVAL`] allows. A failed
/// refresh is logged and swallowed: credentials are left in place and the API
/// layer's 401 handling remains the point where a dead session surfaces. A
/// host that wants to act sooner can install a failure handler.
///
/// Handles are cheap to clone and share one state; dropping the last handle
/// cancels any pending timer.
pub struct SessionRefreshScheduler<S, B> {
    inner: Arc<SchedulerInner<S, B>>,
}

impl<S, B> Clone for SessionRefreshScheduler<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SchedulerInner<S, B> {
    store: S,
    backend: B,
    api: ApiClient,
    state: Mutex<RefreshState>,
    on_refresh_failed: Option<FailureHandler>,
}

#[derive(Default)]
struct RefreshState {
    /// At most one armed timer; re-scheduling supersedes it.
    pending: Option<JoinHandle<()>>,
    /// Distinguishes a fired timer from its replacement.
    timer_generation: u64,
    /// True while a refresh request is in flight.
    is_refreshing: bool,
    last_attempt: Option<Instant>,
}

impl<S, B> Drop for SchedulerInner<S, B> {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }
}

impl<S, B> SessionRefreshScheduler<S, B>
where
    S: CredentialStore + Send + Sync + 'static,
    B: AuthBackend + 'static,
{
    pub fn new(store: S, backend: B, api: ApiClient) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                backend,
                api,
                state: Mutex::new(RefreshState::default()),
                on_refresh_failed: None,
            }),
        }
    }

    /// Like [`new`](Self::new), with an observer invoked on every swallowed
    /// refresh failure so the host can decide about forcing a logout.
    pub fn with_failure_handler(
        store: S,
        backend: B,
        api: ApiClient,
        handler: impl Fn(&AppError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                backend,
                api,
                state: Mutex::new(RefreshState::default()),
                on_refresh_failed: Some(Box::new(handler)),
            }),
        }
    }

    /// Seeds the schedule from whatever access token is currently stored.
    /// An unauthenticated store is a valid state and a no-op.
    pub fn start(&self) -> AppResult<()> {
        if let Some(access_token) = self.inner.store.access_token()? {
            self.schedule_refresh(&access_token);
        }

        Ok(())
    }

    /// Arms the renewal timer for the given access token, superseding any
    /// pending one. A token without a decodable expiry arms nothing.
    pub fn schedule_refresh(&self, access_token: &str) {
        let mut state = self.state();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.timer_generation = state.timer_generation.wrapping_add(1);

        let Some(expires_at) = token::expiry_millis(access_token) else {
            debug!("access token has no usable expiry; refresh not scheduled");
            return;
        };

        let delay = refresh_delay(expires_at, unix_millis());
        debug!(delay_ms = delay.as_millis() as u64, "refresh timer armed");

        let generation = state.timer_generation;
        let weak = Arc::downgrade(&self.inner);
        state.pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;

            let Some(scheduler) = Self::upgrade(&weak) else {
                return;
            };
            // The timer has fired; release its handle so a reschedule cannot
            // abort the refresh it is about to run.
            scheduler.release_timer(generation);
            scheduler.refresh_now().await;
        }));
    }

    /// Exchanges the stored refresh token for a fresh pair, then re-arms the
    /// schedule from the new access token.
    ///
    /// Silently returns when a refresh is already in flight, when the last
    /// attempt was under [`MIN_REFRESH_INTERVAL`] ago, or when no refresh
    /// token is stored. Failures never propagate to the caller.
    pub async fn refresh_now(&self) {
        let refresh_token = {
            let mut state = self.state();
            if state.is_refreshing {
                debug!("refresh already in flight; attempt suppressed");
                return;
            }

            let now = Instant::now();
            if let Some(last_attempt) = state.last_attempt {
                if now.duration_since(last_attempt) < MIN_REFRESH_INTERVAL {
                    debug!("refresh attempted too recently; attempt suppressed");
                    return;
                }
            }

            let refresh_token = match self.inner.store.refresh_token() {
                Ok(Some(refresh_token)) => refresh_token,
                // Unauthenticated context is a valid state.
                Ok(None) => return,
                Err(err) => {
                    warn!(error = %err, "credential store read failed");
                    return;
                }
            };

            state.is_refreshing = true;
            state.last_attempt = Some(now);
            refresh_token
        };

        match self.inner.backend.refresh(&refresh_token).await {
            Ok(pair) => {
                self.inner.api.set_token(&pair.access_token);
                if let Err(err) = self.inner.store.store_pair(&pair) {
                    warn!(error = %err, "failed to persist refreshed credentials");
                }

                info!("session token refreshed");
                self.schedule_refresh(&pair.access_token);
            }
            Err(err) => {
                // Credentials stay in place: the API layer's 401 mapping is
                // the enforcement point for a dead session.
                warn!(error = %err, "session refresh failed");
                if let Some(handler) = &self.inner.on_refresh_failed {
                    handler(&err);
                }
            }
        }

        self.state().is_refreshing = false;
    }

    /// Cancels any pending timer. Safe to call with none armed. An in-flight
    /// refresh is not interrupted; its result is still applied.
    pub fn cancel_scheduled_refresh(&self) {
        let mut state = self.state();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.timer_generation = state.timer_generation.wrapping_add(1);
    }

    /// Follows the credential store's change feed: an access token written by
    /// another context re-arms the schedule, a removed one cancels it. Ends
    /// when the store or the scheduler goes away.
    pub fn spawn_store_watcher(&self) -> JoinHandle<()> {
        let mut changes = self.inner.store.subscribe();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key == CredentialKey::AccessToken => {
                        let Some(scheduler) = Self::upgrade(&weak) else {
                            return;
                        };
                        match change.new_value {
                            Some(access_token) => scheduler.schedule_refresh(&access_token),
                            None => scheduler.cancel_scheduled_refresh(),
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "credential change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }

    fn release_timer(&self, generation: u64) {
        let mut state = self.state();
        if state.timer_generation == generation {
            state.pending = None;
        }
    }

    fn upgrade(weak: &Weak<SchedulerInner<S, B>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn refresh_delay(expires_at_millis: u64, now_millis: u64) -> Duration {
    let until_expiry = expires_at_millis.saturating_sub(now_millis);
    let buffer = REFRESH_BUFFER.as_millis() as u64;

    if until_expiry <= buffer {
        STALE_TOKEN_DEFER
    } else {
        Duration::from_millis(until_expiry - buffer)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_lands_buffer_ahead_of_expiry() {
        let now = 1_700_000_000_000;
        let expires_at = now + 3_600_000;

        // One hour of validity leaves a 55 minute delay.
        assert_eq!(
            refresh_delay(expires_at, now),
            Duration::from_secs(55 * 60)
        );
    }

    #[test]
    fn token_inside_buffer_gets_short_defer() {
        let now = 1_700_000_000_000;

        assert_eq!(
            refresh_delay(now + REFRESH_BUFFER.as_millis() as u64, now),
            STALE_TOKEN_DEFER
        );
        assert_eq!(
            refresh_delay(now + 60_000, now),
            STALE_TOKEN_DEFER
        );
    }

    #[test]
    fn expired_token_never_yields_negative_delay() {
        let now = 1_700_000_000_000;
        assert_eq!(refresh_delay(now - 10_000, now), STALE_TOKEN_DEFER);
        assert_eq!(refresh_delay(0, now), STALE_TOKEN_DEFER);
    }
}
