//! Application state.

use std::sync::Arc;

use formcredits_store::Store;

use crate::config::ServiceConfig;
use crate::ledger::CreditLedger;
use crate::payments::PaymentsClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger.
    pub ledger: CreditLedger,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Payment processor client (optional).
    pub payments: Option<Arc<PaymentsClient>>,
}

impl AppState {
    /// Create a new application state over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let ledger = CreditLedger::new(store, config.credits.clone());

        // Create payments client if configured
        let payments = config
            .payments_api_url
            .as_ref()
            .zip(config.payments_api_key.as_ref())
            .and_then(|(url, key)| {
                match PaymentsClient::new(url, key, config.payments_webhook_secret.clone()) {
                    Ok(client) => {
                        tracing::info!(payments_url = %url, "Payments integration enabled");
                        Some(Arc::new(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create payments client");
                        None
                    }
                }
            });

        if payments.is_none() {
            tracing::warn!("Payments not configured - checkout sessions will not be available");
        }

        Self {
            ledger,
            config,
            payments,
        }
    }

    /// Check if the payment processor is configured.
    #[must_use]
    pub fn has_payments(&self) -> bool {
        self.payments.is_some()
    }
}
