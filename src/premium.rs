use crate::storage::{KeyValueStore, PREMIUM_KEY};
use anyhow::Result;

pub const PREMIUM_PRODUCT_ID: &str = "premium_access";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseEvent {
    Approved { product_id: String },
    Verified { product_id: String },
    Owned { product_id: String },
    Cancelled { product_id: String },
    Failed { message: String },
}

/// The narrow view of a store product this crate needs; the gateway adapter
/// hides whatever shape the platform billing plugin actually has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumProduct {
    pub product_id: String,
    pub owned: bool,
}

pub trait BillingGateway {
    fn register_product(&mut self, product_id: &str) -> Result<()>;
    fn query_ownership(&mut self, product_id: &str) -> Result<bool>;
    fn request_purchase(&mut self, product_id: &str) -> Result<()>;
    fn poll_events(&mut self) -> Vec<PurchaseEvent>;
}

/// For runtimes without a billing plugin: nothing is ever owned.
#[derive(Debug, Default)]
pub struct NullBillingGateway;

impl NullBillingGateway {
    pub fn new() -> Self {
        Self
    }
}

impl BillingGateway for NullBillingGateway {
    fn register_product(&mut self, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn query_ownership(&mut self, _product_id: &str) -> Result<bool> {
        Ok(false)
    }

    fn request_purchase(&mut self, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PurchaseEvent> {
        Vec::new()
    }
}

pub struct PremiumAccess {
    gateway: Box<dyn BillingGateway>,
    unlocked: bool,
}

impl PremiumAccess {
    /// Loads the locally persisted unlock first so premium keeps working
    /// offline, then reconciles with the store's ownership record.
    pub fn new(mut gateway: Box<dyn BillingGateway>, store: &mut dyn KeyValueStore) -> Self {
        let mut unlocked = matches!(store.get(PREMIUM_KEY), Ok(Some(value)) if value == "true");

        if let Err(err) = gateway.register_product(PREMIUM_PRODUCT_ID) {
            log::warn!("failed to register premium product: {err:#}");
        }
        match gateway.query_ownership(PREMIUM_PRODUCT_ID) {
            Ok(true) => unlocked = true,
            Ok(false) => {}
            Err(err) => log::debug!("ownership query unavailable: {err:#}"),
        }

        let access = Self { gateway, unlocked };
        if access.unlocked {
            persist_unlock(store);
        }
        access
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn product(&self) -> PremiumProduct {
        PremiumProduct {
            product_id: PREMIUM_PRODUCT_ID.to_string(),
            owned: self.unlocked,
        }
    }

    /// Fire-and-forget; the outcome arrives later through `poll_events`.
    pub fn request_purchase(&mut self) {
        if self.unlocked {
            return;
        }
        if let Err(err) = self.gateway.request_purchase(PREMIUM_PRODUCT_ID) {
            log::warn!("failed to start purchase flow: {err:#}");
        }
    }

    /// Folds pending gateway events into the unlock flag. Returns true when
    /// the flag changed so the caller can propagate it.
    pub fn tick(&mut self, store: &mut dyn KeyValueStore) -> bool {
        let mut changed = false;
        for event in self.gateway.poll_events() {
            match event {
                PurchaseEvent::Approved { product_id } => {
                    log::debug!("purchase approved for {product_id}, awaiting verification");
                }
                PurchaseEvent::Verified { product_id } | PurchaseEvent::Owned { product_id } => {
                    if product_id == PREMIUM_PRODUCT_ID && !self.unlocked {
                        self.unlocked = true;
                        changed = true;
                        persist_unlock(store);
                    }
                }
                PurchaseEvent::Cancelled { product_id } => {
                    log::debug!("purchase cancelled for {product_id}");
                }
                PurchaseEvent::Failed { message } => {
                    log::warn!("purchase failed: {message}");
                }
            }
        }
        changed
    }
}

fn persist_unlock(store: &mut dyn KeyValueStore) {
    if let Err(err) = store.set(PREMIUM_KEY, "true") {
        log::warn!("failed to persist premium unlock: {err:#}");
    }
}
