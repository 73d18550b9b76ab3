//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use gig_firestore::{DocumentStore, FirestoreClient, MemoryStore};
use gig_payments::{PaymentError, PaymentProcessor, StripeClient};

use crate::config::{ApiConfig, StoreBackend};
use crate::services::{BidLedger, CredentialStore, JobCatalog, PaymentRelay, TokenIssuer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn DocumentStore>,
    pub credentials: CredentialStore,
    pub tokens: TokenIssuer,
    pub catalog: JobCatalog,
    pub ledger: BidLedger,
    pub payments: PaymentRelay,
}

impl AppState {
    /// Wire every component onto one store handle.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn DocumentStore>,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(Arc::clone(&store)),
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl),
            catalog: JobCatalog::new(Arc::clone(&store)),
            ledger: BidLedger::new(Arc::clone(&store)),
            payments: PaymentRelay::new(processor),
            config,
            store,
        }
    }

    /// Build state from the environment: the configured store backend and,
    /// when `STRIPE_SECRET_KEY` is set, the Stripe processor.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => Arc::new(FirestoreClient::from_env().await?),
            StoreBackend::Memory => {
                if config.is_production() {
                    warn!("Using the in-memory store in production; data is lost on restart");
                }
                Arc::new(MemoryStore::new())
            }
        };
        info!(backend = store.backend(), "Document store ready");

        let processor: Option<Arc<dyn PaymentProcessor>> = match StripeClient::from_env() {
            Ok(client) => {
                info!("Stripe payment processor configured");
                Some(Arc::new(client))
            }
            Err(PaymentError::NotConfigured) => {
                warn!("STRIPE_SECRET_KEY not set, /pay will answer 503");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(config, store, processor))
    }
}
