//! View lifetime
//!
//! Every view owns a [`ViewScope`]. Work run through the scope resolves to
//! `None` once the view is unmounted, so late results never touch a view
//! that is gone.

use std::future::Future;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

/// Cloneable handle to a scope, for tasks spawned by a view
#[derive(Debug, Clone)]
pub struct ViewHandle {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut`, or return `None` if the view unmounts first
    pub async fn run<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        run_until_cancelled(&self.token, fut).await
    }

    pub fn handle(&self) -> ViewHandle {
        ViewHandle {
            token: self.token.clone(),
        }
    }

    pub fn unmount(&self) {
        self.token.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl ViewHandle {
    pub async fn run<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        run_until_cancelled(&self.token, fut).await
    }

    pub fn unmount(&self) {
        self.token.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }
}

async fn run_until_cancelled<F, T>(token: &CancellationToken, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    if token.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        value = fut => Some(value),
    }
}
