//! Ledger plugins and who owns their lifecycle.
//!
//! A plugin is the sender's connection to the Interledger network. Callers
//! may hand one in, in which case it is used as-is and never connected or
//! disconnected here. Otherwise a [`PluginFactory`] creates one per paid
//! request; that plugin is connected before the session and disconnected
//! after it, whichever way the session ends.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::error::{PaymentError, PluginError};

/// A connection to the payment network.
#[async_trait::async_trait]
pub trait LedgerPlugin: Send + Sync {
    /// Connects to the network.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Connect`] if the network is unreachable.
    async fn connect(&self) -> Result<(), PluginError>;

    /// Disconnects from the network.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Disconnect`] if the plugin cannot shut down cleanly.
    async fn disconnect(&self) -> Result<(), PluginError>;
}

/// Creates ledger plugins on demand.
pub trait PluginFactory: Send + Sync {
    /// Returns a fresh, not yet connected plugin.
    fn create(&self) -> Arc<dyn LedgerPlugin>;
}

impl<F> PluginFactory for F
where
    F: Fn() -> Arc<dyn LedgerPlugin> + Send + Sync,
{
    fn create(&self) -> Arc<dyn LedgerPlugin> {
        self()
    }
}

/// A plugin together with the party responsible for its lifecycle.
#[derive(Clone)]
pub enum LedgerHandle {
    /// Supplied by the caller, who keeps ownership.
    Borrowed(Arc<dyn LedgerPlugin>),
    /// Created for this request; disconnected on [`LedgerHandle::release`].
    Owned(Arc<dyn LedgerPlugin>),
}

impl LedgerHandle {
    /// Borrows `caller_plugin` if given, otherwise creates and connects one.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NoLedgerPlugin`] if there is neither a caller
    /// plugin nor a factory, and [`PaymentError::Plugin`] if connecting fails.
    pub async fn acquire(
        caller_plugin: Option<Arc<dyn LedgerPlugin>>,
        factory: Option<&dyn PluginFactory>,
    ) -> Result<Self, PaymentError> {
        if let Some(plugin) = caller_plugin {
            return Ok(Self::Borrowed(plugin));
        }
        let plugin = factory.ok_or(PaymentError::NoLedgerPlugin)?.create();
        #[cfg(feature = "telemetry")]
        tracing::trace!("connecting ledger plugin");
        plugin.connect().await?;
        Ok(Self::Owned(plugin))
    }

    /// The underlying plugin.
    #[must_use]
    pub fn plugin(&self) -> Arc<dyn LedgerPlugin> {
        match self {
            Self::Borrowed(plugin) | Self::Owned(plugin) => Arc::clone(plugin),
        }
    }

    /// Disconnects the plugin if it is owned; borrowed plugins are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Disconnect`] if an owned plugin fails to disconnect.
    pub async fn release(self) -> Result<(), PluginError> {
        match self {
            Self::Borrowed(_) => Ok(()),
            Self::Owned(plugin) => {
                #[cfg(feature = "telemetry")]
                tracing::trace!("disconnecting ledger plugin");
                plugin.disconnect().await
            }
        }
    }
}

impl Debug for LedgerHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrowed(_) => f.write_str("LedgerHandle::Borrowed"),
            Self::Owned(_) => f.write_str("LedgerHandle::Owned"),
        }
    }
}
