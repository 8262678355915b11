//! Wallet connection state
//!
//! Connection state is an explicit finite-state value owned by one holder.
//! Push callbacks from the wallet bridge and interval polls both reduce to
//! events folded through a single transition function, so tests drive the
//! machine without timers.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("wallet provider not found")]
    ProviderMissing,
    #[error("wallet operation failed: {0}")]
    Provider(String),
}

/// Connection state of the browser wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletStatus {
    Disconnected,
    Connecting,
    Connected(String),
}

impl WalletStatus {
    pub fn address(&self) -> Option<&str> {
        match self {
            WalletStatus::Connected(address) => Some(address),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, WalletStatus::Connected(_))
    }
}

/// Everything that can move the wallet state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// User asked to connect; approval pending
    ConnectRequested,
    /// Provider approved the connection for an address
    ConnectApproved(String),
    /// Provider rejected or failed the connection attempt
    ConnectFailed(String),
    /// Provider reports the session ended
    Disconnected,
    /// Push callback: the active account changed
    AccountChanged(String),
    /// Interval poll observed the provider's current state
    Observed {
        connected: bool,
        address: Option<String>,
    },
}

/// Fold one event into the current status.
///
/// A poll observing "disconnected" while a connect is in flight keeps
/// `Connecting`; only the connect outcome settles that attempt.
pub fn transition(current: &WalletStatus, event: &WalletEvent) -> WalletStatus {
    match event {
        WalletEvent::ConnectRequested => match current {
            WalletStatus::Disconnected => WalletStatus::Connecting,
            other => other.clone(),
        },
        WalletEvent::ConnectApproved(address) => WalletStatus::Connected(address.clone()),
        WalletEvent::ConnectFailed(_) => match current {
            WalletStatus::Connecting => WalletStatus::Disconnected,
            other => other.clone(),
        },
        WalletEvent::Disconnected => WalletStatus::Disconnected,
        WalletEvent::AccountChanged(address) => WalletStatus::Connected(address.clone()),
        WalletEvent::Observed { connected, address } => match (connected, address, current) {
            (true, Some(address), _) => WalletStatus::Connected(address.clone()),
            (true, None, current) => current.clone(),
            (false, _, WalletStatus::Connecting) => WalletStatus::Connecting,
            (false, _, _) => WalletStatus::Disconnected,
        },
    }
}

/// The injected wallet bridge. Browser extension, test double, or remote
/// signer; the node never sees key material.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request a connection; resolves to the approved address
    async fn connect(&self) -> Result<String, WalletError>;
    async fn disconnect(&self) -> Result<(), WalletError>;
    async fn is_connected(&self) -> Result<bool, WalletError>;
    /// Current account address, when connected
    async fn account(&self) -> Result<Option<String>, WalletError>;
}

/// Turn one provider observation into one state machine event
pub async fn poll_once(provider: &dyn WalletProvider) -> WalletEvent {
    match provider.is_connected().await {
        Ok(true) => match provider.account().await {
            Ok(address) => WalletEvent::Observed {
                connected: true,
                address,
            },
            Err(_) => WalletEvent::Observed {
                connected: false,
                address: None,
            },
        },
        _ => WalletEvent::Observed {
            connected: false,
            address: None,
        },
    }
}

/// Owns the wallet status and publishes changes on a watch channel
pub struct WalletMonitor {
    tx: watch::Sender<WalletStatus>,
}

impl WalletMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(WalletStatus::Disconnected);
        Self { tx }
    }

    pub fn status(&self) -> WalletStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletStatus> {
        self.tx.subscribe()
    }

    /// Status changes as an async stream, for UI layers that consume streams
    pub fn status_stream(&self) -> WatchStream<WalletStatus> {
        WatchStream::new(self.subscribe())
    }

    /// Fold an event into the held status, publishing only on change
    pub fn apply(&self, event: &WalletEvent) -> WalletStatus {
        let next = transition(&self.tx.borrow(), event);
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        next
    }

    /// Drive a full connect interaction against the provider
    pub async fn connect(&self, provider: &dyn WalletProvider) -> Result<String, WalletError> {
        self.apply(&WalletEvent::ConnectRequested);
        match provider.connect().await {
            Ok(address) => {
                self.apply(&WalletEvent::ConnectApproved(address.clone()));
                Ok(address)
            }
            Err(e) => {
                self.apply(&WalletEvent::ConnectFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Drive a disconnect interaction against the provider
    pub async fn disconnect(&self, provider: &dyn WalletProvider) -> Result<(), WalletError> {
        provider.disconnect().await?;
        self.apply(&WalletEvent::Disconnected);
        Ok(())
    }
}

impl Default for WalletMonitor {
    fn default() -> Self {
        Self::new()
    }
}
