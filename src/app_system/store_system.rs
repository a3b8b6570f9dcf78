use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::actor_framework::ResourceActor;
use crate::catalog::CatalogService;
use crate::checkout::CheckoutService;
use crate::clients::{InventoryClient, OrderClient, ProductClient};
use crate::domain::{InventoryEvent, Order, Product, ProductCreate};
use crate::fulfillment::{FulfillmentService, FulfillmentSettings};
use crate::http::AppState;
use crate::integrations::{
    LoggingGateway, LoggingMailer, LoggingPos, Mailer, PaymentGateway, PosInventory, ResendMailer, SquareInventory,
    StripeGateway,
};
use crate::webhooks::{WebhookReceiver, WebhookSettings};
use super::config::AppConfig;
use super::error::SystemError;

const VENDOR_TIMEOUT: Duration = Duration::from_secs(15);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The vendor seams the services call out through.
#[derive(Clone)]
pub struct Integrations {
    pub gateway: Arc<dyn PaymentGateway>,
    pub pos: Arc<dyn PosInventory>,
    pub mailer: Arc<dyn Mailer>,
}

impl Integrations {
    /// Stand-ins that only log; used when no credentials are configured.
    pub fn logging() -> Self {
        Self {
            gateway: Arc::new(LoggingGateway),
            pos: Arc::new(LoggingPos),
            mailer: Arc::new(LoggingMailer),
        }
    }

    /// Real HTTP clients for each provider with credentials, logging
    /// stand-ins for the rest.
    pub fn from_config(config: &AppConfig) -> Result<Self, SystemError> {
        let http = reqwest::Client::builder().timeout(VENDOR_TIMEOUT).build()?;
        let mut integrations = Self::logging();

        if let Some(secret_key) = &config.payments.secret_key {
            let p = &config.payments;
            integrations.gateway = Arc::new(StripeGateway::new(
                http.clone(),
                &p.api_base,
                secret_key,
                &p.currency,
                &p.success_url,
                &p.cancel_url,
                p.shipping_countries.clone(),
            ));
        } else {
            warn!("No payment secret key configured, checkout sessions are local only");
        }

        if let (Some(token), Some(location)) = (&config.pos.access_token, &config.pos.location_id) {
            integrations.pos = Arc::new(SquareInventory::new(http.clone(), &config.pos.api_base, token, location));
        } else {
            info!("POS sync disabled");
        }

        if let Some(api_key) = &config.email.api_key {
            integrations.mailer = Arc::new(ResendMailer::new(http, &config.email.api_base, api_key, &config.email.from));
        } else {
            info!("Email delivery disabled");
        }

        Ok(integrations)
    }
}

/// Owns the three stores and the services wired on top of them.
///
/// Stores stop once every client handle is dropped; `shutdown` drops the
/// handles held here and waits for the store tasks.
pub struct StoreSystem {
    pub product_client: ProductClient,
    pub order_client: OrderClient,
    pub inventory_client: InventoryClient,
    pub catalog: CatalogService,
    pub checkout: CheckoutService,
    pub fulfillment: FulfillmentService,
    pub webhooks: WebhookReceiver,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl StoreSystem {
    pub fn new(
        buffer_size: usize,
        integrations: Integrations,
        fulfillment_settings: FulfillmentSettings,
        webhook_settings: WebhookSettings,
    ) -> Self {
        let product_id_counter = Arc::new(AtomicU64::new(1));
        let next_product_id = move || format!("product_{}", product_id_counter.fetch_add(1, Ordering::SeqCst));
        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(buffer_size, next_product_id);
        let product_client = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        // Order numbers are derived from these ids, so they must carry hex.
        let (order_actor, order_resource_client) =
            ResourceActor::<Order>::new(buffer_size, || Uuid::new_v4().to_string());
        let order_client = OrderClient::new(order_resource_client);
        let order_handle = tokio::spawn(order_actor.run());

        let (inventory_actor, inventory_resource_client) =
            ResourceActor::<InventoryEvent>::new(buffer_size, || Uuid::new_v4().to_string());
        let inventory_client = InventoryClient::new(inventory_resource_client);
        let inventory_handle = tokio::spawn(inventory_actor.run());

        let catalog = CatalogService::new(product_client.clone(), inventory_client.clone());
        let checkout = CheckoutService::new(product_client.clone(), order_client.clone(), integrations.gateway);
        let fulfillment = FulfillmentService::new(
            order_client.clone(),
            product_client.clone(),
            inventory_client.clone(),
            integrations.pos,
            integrations.mailer,
            fulfillment_settings,
        );
        let webhooks = WebhookReceiver::new(
            fulfillment.clone(),
            product_client.clone(),
            inventory_client.clone(),
            webhook_settings,
        );

        Self {
            product_client,
            order_client,
            inventory_client,
            catalog,
            checkout,
            fulfillment,
            webhooks,
            handles: vec![product_handle, order_handle, inventory_handle],
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SystemError> {
        let integrations = Integrations::from_config(config)?;
        let fulfillment_settings = FulfillmentSettings { tax_rate_bps: config.fulfillment.tax_rate_bps };
        let webhook_settings = WebhookSettings {
            payment_secret: config.payments.webhook_secret.clone(),
            tolerance_secs: config.payments.webhook_tolerance_secs,
            pos_signature_key: config.pos.signature_key.clone(),
            pos_notification_url: config.pos.notification_url.clone(),
            pos_location_id: config.pos.location_id.clone(),
        };
        Ok(Self::new(config.server.store_buffer, integrations, fulfillment_settings, webhook_settings))
    }

    pub fn app_state(&self) -> AppState {
        AppState { checkout: self.checkout.clone(), webhooks: self.webhooks.clone() }
    }

    /// Lists every product in a JSON seed file. Returns how many were added.
    #[instrument(skip(self))]
    pub async fn seed_catalog(&self, path: &str) -> Result<usize, SystemError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| SystemError::SeedRead { path: path.to_string(), source })?;
        let products: Vec<ProductCreate> = serde_json::from_slice(&raw)
            .map_err(|source| SystemError::SeedFormat { path: path.to_string(), source })?;
        let count = products.len();
        for product in products {
            let name = product.name.clone();
            let id = self.product_client.create_product(product).await?;
            info!(product_id = %id, name = %name, "Product listed");
        }
        Ok(count)
    }

    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down stores");
        let Self { product_client, order_client, inventory_client, catalog, checkout, fulfillment, webhooks, handles } =
            self;
        drop(webhooks);
        drop(fulfillment);
        drop(checkout);
        drop(catalog);
        drop(product_client);
        drop(order_client);
        drop(inventory_client);

        for handle in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Store task failed");
                    return Err(SystemError::StoreTask(e.to_string()));
                }
                Err(_) => {
                    // A client handle is still alive somewhere; the runtime
                    // will drop the task on exit.
                    warn!("Store did not stop within the grace period");
                }
            }
        }
        info!("Shutdown complete");
        Ok(())
    }
}
