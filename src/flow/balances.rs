//! The store balances shown on the home screen.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::blockchain::models::{StoreTokenBalance, TokenConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum HomeBalances {
    Idle,
    Loading,
    Loaded { balances: Vec<StoreTokenBalance> },
    Failed { message: String },
}

/// Identifies one reload. Only the most recent ticket may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket(u64);

/// Holds the latest balance view. Reloads are last-request-wins: a result
/// is dropped when a newer reload was started after it.
pub struct BalanceBoard {
    latest: AtomicU64,
    view: watch::Sender<HomeBalances>,
}

impl Default for BalanceBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceBoard {
    pub fn new() -> Self {
        let (view, _) = watch::channel(HomeBalances::Idle);
        Self {
            latest: AtomicU64::new(0),
            view,
        }
    }

    /// Start a reload and mark the view as loading.
    pub fn begin(&self) -> ReloadTicket {
        let mut ticket = 0;
        self.view.send_modify(|view| {
            ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *view = HomeBalances::Loading;
        });
        ReloadTicket(ticket)
    }

    /// Publish the result of a reload. Returns false when it was superseded.
    pub fn publish(&self, ticket: ReloadTicket, result: HomeBalances) -> bool {
        self.view.send_if_modified(|view| {
            if self.latest.load(Ordering::SeqCst) != ticket.0 {
                debug!("Dropping balances from superseded reload {}", ticket.0);
                return false;
            }
            *view = result;
            true
        })
    }

    pub fn current(&self) -> HomeBalances {
        self.view.borrow().clone()
    }

    /// Balance of `token` in the last loaded view.
    pub fn find(&self, token: &TokenConfig) -> Option<StoreTokenBalance> {
        match &*self.view.borrow() {
            HomeBalances::Loaded { balances } => balances.iter().find(|b| &b.token.config == token).cloned(),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeBalances> {
        self.view.subscribe()
    }
}
