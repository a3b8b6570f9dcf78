//! # Mock Framework
//!
//! Utilities for testing services in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver, then script
//! the store's replies with helpers like [`expect_find`] or [`expect_action`].
//! The recording fakes stand in for the payment, POS and email providers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::actor_framework::{Entity, Predicate, ResourceClient, ResourceRequest, Response};
use crate::app_system::{Integrations, StoreSystem};
use crate::fulfillment::FulfillmentSettings;
use crate::integrations::{
    CheckoutSession, CheckoutSessionRequest, EmailMessage, IntegrationError, Mailer, PaymentGateway, PosCount,
    PosInventory,
};
use crate::webhooks::{WebhookSettings, DEFAULT_TOLERANCE_SECS};

/// Creates a mock client and a receiver for asserting requests.
///
/// The client sends to a channel the test owns, so the test plays the store:
/// it inspects each request and answers with success, rejection or silence.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Response<T::Id, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Response<Option<T>, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

pub async fn expect_find<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Predicate<T>, Response<Option<T>, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Find { predicate, respond_to }) => Some((predicate, respond_to)),
        _ => None,
    }
}

pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Predicate<T>, Response<Vec<T>, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { predicate, respond_to }) => Some((predicate, respond_to)),
        _ => None,
    }
}

pub async fn expect_update<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Patch, Response<T, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Update { id, patch, respond_to }) => Some((id, patch, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Response<T::ActionResult, T::Error>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Polls until `condition` holds or about a second has passed. Background
/// notifications finish shortly after the call that spawned them.
pub async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPos {
    pushes: Mutex<Vec<Vec<PosCount>>>,
}

impl RecordingPos {
    /// Every non-empty push, in order.
    pub fn pushes(&self) -> Vec<Vec<PosCount>> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PosInventory for RecordingPos {
    async fn set_counts(&self, counts: &[PosCount]) -> Result<(), IntegrationError> {
        if !counts.is_empty() {
            self.pushes.lock().unwrap().push(counts.to_vec());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, IntegrationError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(IntegrationError::Api { service: "payments", status: 402, body: "card_declined".into() });
        }
        let n = self.requests.lock().unwrap().len();
        Ok(CheckoutSession {
            id: format!("cs_test_{}", n),
            url: Some(format!("https://pay.test/cs_test_{}", n)),
        })
    }
}

pub const TEST_PAYMENT_SECRET: &str = "whsec_test_secret";
pub const TEST_POS_KEY: &str = "sq_signature_key";
pub const TEST_POS_URL: &str = "https://shop.test/webhooks/pos";
pub const TEST_POS_LOCATION: &str = "LOC1";

/// A running system over real stores with recording providers.
pub struct TestHarness {
    pub system: StoreSystem,
    pub gateway: Arc<RecordingGateway>,
    pub pos: Arc<RecordingPos>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestHarness {
    pub fn start() -> Self {
        Self::with_gateway(RecordingGateway::default())
    }

    pub fn with_gateway(gateway: RecordingGateway) -> Self {
        let gateway = Arc::new(gateway);
        let pos = Arc::new(RecordingPos::default());
        let mailer = Arc::new(RecordingMailer::default());
        let integrations = Integrations { gateway: gateway.clone(), pos: pos.clone(), mailer: mailer.clone() };
        let webhook_settings = WebhookSettings {
            payment_secret: Some(TEST_PAYMENT_SECRET.to_string()),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            pos_signature_key: Some(TEST_POS_KEY.to_string()),
            pos_notification_url: TEST_POS_URL.to_string(),
            pos_location_id: Some(TEST_POS_LOCATION.to_string()),
        };
        let system = StoreSystem::new(32, integrations, FulfillmentSettings { tax_rate_bps: 800 }, webhook_settings);
        Self { system, gateway, pos, mailer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::FrameworkError;
    use crate::clients::ProductClient;
    use crate::domain::{Product, ProductCreate, ProductPatch};
    use crate::product_actor::ProductError;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Product>(10);

        let create_task = tokio::spawn(async move { client.create(ProductCreate::new("Teak sideboard", 45_000, 1)).await });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Teak sideboard");
        responder.send(Ok("product_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("product_1".to_string()));
    }

    #[tokio::test]
    async fn mock_store_can_reject() {
        let (client, mut receiver) = create_mock_client::<Product>(10);

        let get_task = tokio::spawn(async move { client.get("product_9".to_string()).await });
        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "product_9");
        responder
            .send(Err(FrameworkError::Rejected(ProductError::ValidationError("boom".into()))))
            .unwrap();

        assert_eq!(
            get_task.await.unwrap(),
            Err(FrameworkError::Rejected(ProductError::ValidationError("boom".into())))
        );
    }

    #[tokio::test]
    async fn update_is_forwarded_with_patch() {
        let (client, mut receiver) = create_mock_client::<Product>(10);
        let products = ProductClient::new(client);

        let task = tokio::spawn(async move {
            products
                .update_product("product_1".to_string(), ProductPatch { price_cents: Some(9_900), ..Default::default() })
                .await
        });

        let (id, patch, responder) = expect_update(&mut receiver).await.expect("Expected Update request");
        assert_eq!(id, "product_1");
        assert_eq!(patch.price_cents, Some(9_900));
        let mut updated = Product::new("product_1", "Teak sideboard", 9_900, 1);
        updated.original_price_cents = 9_900;
        responder.send(Ok(updated.clone())).unwrap();

        assert_eq!(task.await.unwrap(), Ok(updated));
    }
}
