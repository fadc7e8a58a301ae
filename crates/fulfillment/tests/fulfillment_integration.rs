//! End-to-end workflows of the fulfillment engine against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{AggregateId, MerchantAccountId, ProductId, UserId};
use domain::{
    AdjustmentReason, AdjustmentStatus, Aggregate, MerchantAccountType, Money, Order, OrderStatus,
    PaymentMethod, PaymentState, PaymentStatus, ShippingAddress, StockEvent, VerificationOutcome,
};
use event_store::{EventQuery, EventStore, InMemoryEventStore};
use fulfillment::{
    Actor, AdjustmentRequest, CancelOrderRequest, Clock, CreatePaymentRequest, Fulfillment,
    FulfillmentConfig, FulfillmentError, InMemoryMerchantAccounts, ManualClock, MerchantAccount,
    Notification, OrderLineRequest, Outbox, PlaceOrderRequest, RefundPaymentRequest,
    RegisterProductRequest, ReturnOrderRequest, ReviewAdjustmentRequest, ReviewDecision,
    UpdateOrderStatusRequest, VerifyPaymentRequest,
};
use tokio::sync::mpsc::UnboundedReceiver;

struct TestHarness {
    engine: Fulfillment<InMemoryEventStore>,
    store: InMemoryEventStore,
    clock: ManualClock,
    merchants: InMemoryMerchantAccounts,
    notifications: UnboundedReceiver<Notification>,
    admin: Actor,
    customer: Actor,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        let clock = ManualClock::default();
        let merchants = InMemoryMerchantAccounts::new();
        let (outbox, notifications) = Outbox::channel();

        let engine = Fulfillment::new(
            store.clone(),
            Arc::new(merchants.clone()),
            Arc::new(clock.clone()),
            outbox,
            FulfillmentConfig::default(),
        );

        Self {
            engine,
            store,
            clock,
            merchants,
            notifications,
            admin: Actor::admin(UserId::new()),
            customer: Actor::customer(UserId::new()),
        }
    }

    async fn product(&self, name: &str, stock: u32) -> ProductId {
        let product_id = ProductId::new();
        self.engine
            .inventory
            .register_product(
                &self.admin,
                RegisterProductRequest {
                    product_id,
                    name: name.to_string(),
                    initial_stock: stock,
                    low_stock_threshold: None,
                },
            )
            .await
            .unwrap();
        product_id
    }

    async fn stock(&self, product_id: ProductId) -> u32 {
        self.engine
            .inventory
            .stock_level(product_id)
            .await
            .unwrap()
            .stock
    }

    async fn place_as(
        &self,
        actor: &Actor,
        lines: &[(ProductId, u32, i64)],
        method: PaymentMethod,
    ) -> Result<Order, FulfillmentError> {
        self.engine
            .orders
            .place_order(actor, place_request(lines, method))
            .await
    }

    async fn place(&self, lines: &[(ProductId, u32, i64)]) -> Result<Order, FulfillmentError> {
        self.place_as(&self.customer, lines, PaymentMethod::CashOnDelivery)
            .await
    }

    async fn set_status(&self, order_id: AggregateId, status: OrderStatus) -> Order {
        self.engine
            .orders
            .update_status(&self.admin, order_id, UpdateOrderStatusRequest { status })
            .await
            .unwrap()
    }

    async fn bkash_account(&self) {
        self.merchants
            .upsert(MerchantAccount {
                id: MerchantAccountId::new(),
                account_type: MerchantAccountType::Bkash,
                account_name: "Aarong Crafts".to_string(),
                account_number: "01800000000".to_string(),
                bank_name: None,
                branch_name: None,
                is_active: true,
                is_verified: true,
                is_primary: true,
            })
            .await;
    }

    async fn bkash_payment(&self, order_id: AggregateId) -> AggregateId {
        let payment = self
            .engine
            .payments
            .create_payment(
                &self.customer,
                order_id,
                CreatePaymentRequest {
                    method: PaymentMethod::Bkash,
                    transaction_id: Some("8N7A6D5C".to_string()),
                    payment_proof: None,
                },
            )
            .await
            .unwrap();
        payment.id().unwrap()
    }

    async fn verify(
        &self,
        payment_id: AggregateId,
        outcome: VerificationOutcome,
    ) -> Result<domain::Payment, FulfillmentError> {
        self.engine
            .payments
            .verify_payment(
                &self.admin,
                payment_id,
                VerifyPaymentRequest {
                    outcome,
                    note: None,
                },
            )
            .await
    }

    async fn request_adjustment(
        &self,
        order: &Order,
        quantity: u32,
        reason: AdjustmentReason,
        cancellation: bool,
    ) -> Result<domain::Adjustment, FulfillmentError> {
        let request = AdjustmentRequest {
            order_item_id: order.items()[0].id,
            quantity,
            reason,
            details: None,
        };
        let order_id = order.id().unwrap();
        if cancellation {
            self.engine
                .adjustments
                .request_cancellation(&self.customer, order_id, request)
                .await
        } else {
            self.engine
                .adjustments
                .request_return(&self.customer, order_id, request)
                .await
        }
    }

    async fn review(
        &self,
        order_id: AggregateId,
        adjustment_id: common::AdjustmentId,
        decision: ReviewDecision,
    ) -> Result<domain::Adjustment, FulfillmentError> {
        self.engine
            .adjustments
            .review(
                &self.admin,
                order_id,
                adjustment_id,
                ReviewAdjustmentRequest {
                    decision,
                    note: None,
                },
            )
            .await
    }

    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn drain(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            drained.push(notification);
        }
        drained
    }

    /// Sums stock movements of one order, by event type.
    async fn moved(&self, order_id: AggregateId, event_type: &str) -> u32 {
        let events = self
            .store
            .query_events(EventQuery::for_event_type(event_type))
            .await
            .unwrap();
        events
            .into_iter()
            .map(|e| serde_json::from_value::<StockEvent>(e.payload).unwrap())
            .map(|event| match event {
                StockEvent::StockReserved(data) if data.order_id == order_id => data.quantity,
                StockEvent::StockReleased(data) if data.order_id == order_id => data.quantity,
                _ => 0,
            })
            .sum()
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Tahmina Akter".to_string(),
        phone: "01711223344".to_string(),
        address_line: "Flat 4B, Road 11, Banani".to_string(),
        city: "Dhaka".to_string(),
        postal_code: Some("1213".to_string()),
        country: "Bangladesh".to_string(),
    }
}

fn place_request(lines: &[(ProductId, u32, i64)], method: PaymentMethod) -> PlaceOrderRequest {
    let items: Vec<OrderLineRequest> = lines
        .iter()
        .map(|&(product_id, quantity, cents)| OrderLineRequest {
            product_id,
            quantity,
            unit_price: Money::from_cents(cents),
        })
        .collect();
    let declared_total =
        Money::checked_sum(items.iter().map(OrderLineRequest::subtotal)).unwrap();
    PlaceOrderRequest {
        items,
        shipping_address: address(),
        payment_method: method,
        declared_total,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn place_reserves_stock() {
    let mut h = TestHarness::new();
    let product = h.product("Nakshi Kantha", 5).await;

    let order = h.place(&[(product, 3, 1000)]).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Placed);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    assert_eq!(order.total_amount(), Money::from_cents(3000));
    assert_eq!(h.stock(product).await, 2);

    let notifications = h.drain();
    let order_id = order.id().unwrap();
    assert!(notifications.contains(&Notification::OrderStatus {
        user_id: h.customer.user_id,
        order_id,
        status: OrderStatus::Placed,
    }));
    assert!(
        notifications
            .iter()
            .any(|n| matches!(n, Notification::OrderConfirmationEmail { .. }))
    );
    assert!(notifications.iter().any(|n| matches!(
        n,
        Notification::LowStock { product_id, stock: 2, threshold: 5, .. } if *product_id == product
    )));
}

#[tokio::test]
async fn place_beyond_stock_fails_and_names_product() {
    let mut h = TestHarness::new();
    let product = h.product("Jamdani Saree", 5).await;

    let err = h.place(&[(product, 6, 1000)]).await.unwrap_err();

    match &err {
        FulfillmentError::InsufficientStock {
            name,
            requested,
            available,
            ..
        } => {
            assert_eq!(name, "Jamdani Saree");
            assert_eq!(*requested, 6);
            assert_eq!(*available, 5);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("Jamdani Saree"));
    assert_eq!(h.stock(product).await, 5);
    assert!(h.drain().is_empty());
    assert!(h.engine.orders.list_orders(&h.customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_restores_every_line() {
    let h = TestHarness::new();
    let kantha = h.product("Nakshi Kantha", 5).await;
    let pati = h.product("Shital Pati", 6).await;
    let order = h.place(&[(kantha, 1, 1000), (pati, 2, 500)]).await.unwrap();
    assert_eq!(h.stock(kantha).await, 4);
    assert_eq!(h.stock(pati).await, 4);

    let cancelled = h
        .engine
        .orders
        .cancel_order(
            &h.customer,
            order.id().unwrap(),
            CancelOrderRequest {
                reason: Some("ordered twice".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason(), Some("ordered twice"));
    assert_eq!(h.stock(kantha).await, 5);
    assert_eq!(h.stock(pati).await, 6);
}

#[tokio::test]
async fn return_after_window_is_rejected() {
    let h = TestHarness::new();
    let product = h.product("Terracotta Vase", 5).await;
    let order = h.place(&[(product, 1, 2500)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.set_status(order_id, OrderStatus::Delivered).await;

    h.clock.advance(Duration::days(11));
    let err = h
        .engine
        .orders
        .return_order(
            &h.customer,
            order_id,
            ReturnOrderRequest {
                reason: "changed my mind".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::WindowExpired { .. }));
    assert_eq!(h.stock(product).await, 4);
}

#[tokio::test]
async fn approved_partial_cancellation_shrinks_line_total_and_stock() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 10).await;
    let order = h.place(&[(product, 5, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    assert_eq!(h.stock(product).await, 5);

    let adjustment = h
        .request_adjustment(&order, 2, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();
    assert_eq!(adjustment.refund_amount, Money::from_cents(2000));
    assert_eq!(adjustment.status, AdjustmentStatus::Requested);
    assert_eq!(h.stock(product).await, 5);

    let approved = h
        .review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();
    assert_eq!(approved.status, AdjustmentStatus::Approved);

    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.total_amount(), Money::from_cents(3000));
    assert_eq!(order.items()[0].quantity, 3);
    assert_eq!(order.items()[0].original_quantity, 5);
    assert_eq!(h.stock(product).await, 7);
}

#[tokio::test]
async fn completed_payment_advances_placed_order() {
    let mut h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Rickshaw Art Tray", 5).await;
    let order = h
        .place_as(&h.customer, &[(product, 1, 4500)], PaymentMethod::Bkash)
        .await
        .unwrap();
    let order_id = order.id().unwrap();

    let payment_id = h.bkash_payment(order_id).await;
    let payment = h.engine.payments.get_payment(&h.customer, payment_id).await.unwrap();
    assert_eq!(payment.state(), PaymentState::Processing);
    assert_eq!(payment.amount(), Money::from_cents(4500));
    assert_eq!(
        payment.receiver_account().map(|a| a.account_type),
        Some(MerchantAccountType::Bkash)
    );
    h.drain();

    let payment = h.verify(payment_id, VerificationOutcome::Completed).await.unwrap();
    assert_eq!(payment.state(), PaymentState::Completed);

    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Paid);
    assert_eq!(order.status(), OrderStatus::Processing);

    let notifications = h.drain();
    assert!(notifications.iter().any(|n| matches!(
        n,
        Notification::PaymentVerifiedEmail {
            outcome: VerificationOutcome::Completed,
            ..
        }
    )));
    assert!(notifications.contains(&Notification::OrderStatus {
        user_id: h.customer.user_id,
        order_id,
        status: OrderStatus::Processing,
    }));
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_line_leaves_earlier_lines_unreserved() {
    let h = TestHarness::new();
    let plenty = h.product("Clay Pot", 5).await;
    let scarce = h.product("Silk Shawl", 1).await;

    let err = h
        .place(&[(plenty, 3, 1000), (scarce, 2, 1000)])
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::InsufficientStock { .. }));
    assert_eq!(h.stock(plenty).await, 5);
    assert_eq!(h.stock(scarce).await, 1);
}

#[tokio::test]
async fn unknown_product_is_reported_before_stock() {
    let h = TestHarness::new();
    let empty = h.product("Sold Out Mug", 0).await;

    let err = h
        .place(&[(empty, 1, 1000), (ProductId::new(), 1, 1000)])
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::NotFound(_)));
}

#[tokio::test]
async fn two_lines_for_one_product_share_its_stock() {
    let h = TestHarness::new();
    let product = h.product("Bamboo Basket", 4).await;

    let err = h
        .place(&[(product, 3, 1000), (product, 2, 1000)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FulfillmentError::InsufficientStock { available: 1, .. }
    ));

    h.place(&[(product, 2, 1000), (product, 2, 1000)])
        .await
        .unwrap();
    assert_eq!(h.stock(product).await, 0);
}

#[tokio::test]
async fn mismatched_declared_total_is_invalid() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let mut request = place_request(&[(product, 2, 1000)], PaymentMethod::CashOnDelivery);
    request.declared_total = Money::from_cents(1500);

    let err = h
        .engine
        .orders
        .place_order(&h.customer, request)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::Validation(_)));
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn overflowing_line_total_is_invalid() {
    let h = TestHarness::new();
    let product = h.product("Gold Bar", 5).await;
    let mut request = place_request(&[(product, 1, 1000)], PaymentMethod::CashOnDelivery);
    request.items[0].quantity = 2;
    request.items[0].unit_price = Money::from_cents(i64::MAX / 2 + 1);
    request.declared_total = Money::from_cents(i64::MIN);

    let err = h
        .engine
        .orders
        .place_order(&h.customer, request)
        .await
        .unwrap_err();
    match err {
        FulfillmentError::Validation(message) => {
            assert_eq!(message, "order total is out of range")
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(h.stock(product).await, 5);
}

// ---------------------------------------------------------------------------
// Ownership and admin paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn other_customers_orders_look_missing() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 1, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    let stranger = Actor::customer(UserId::new());

    assert!(matches!(
        h.engine.orders.get_order(&stranger, order_id).await,
        Err(FulfillmentError::NotFound(_))
    ));
    assert!(matches!(
        h.engine
            .orders
            .cancel_order(&stranger, order_id, CancelOrderRequest::default())
            .await,
        Err(FulfillmentError::NotFound(_))
    ));
    assert!(h.engine.orders.get_order(&h.admin, order_id).await.is_ok());
    assert_eq!(h.stock(product).await, 4);
}

#[tokio::test]
async fn list_orders_scopes_by_owner() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 10).await;
    let other = Actor::customer(UserId::new());

    let first = h.place(&[(product, 1, 1000)]).await.unwrap();
    h.place_as(&other, &[(product, 1, 1000)], PaymentMethod::CashOnDelivery)
        .await
        .unwrap();
    let second = h.place(&[(product, 2, 1000)]).await.unwrap();

    let mine = h.engine.orders.list_orders(&h.customer).await.unwrap();
    let ids: Vec<_> = mine.iter().map(|o| o.id().unwrap()).collect();
    assert_eq!(ids, vec![second.id().unwrap(), first.id().unwrap()]);

    let all = h.engine.orders.list_orders(&h.admin).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn shipped_order_cannot_be_cancelled() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 1, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.set_status(order_id, OrderStatus::Shipped).await;

    let err = h
        .engine
        .orders
        .cancel_order(&h.customer, order_id, CancelOrderRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::InvalidState(_)));
    assert_eq!(h.stock(product).await, 4);
}

#[tokio::test]
async fn admin_status_updates() {
    let mut h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 2, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.drain();

    let forbidden = h
        .engine
        .orders
        .update_status(
            &h.customer,
            order_id,
            UpdateOrderStatusRequest {
                status: OrderStatus::Shipped,
            },
        )
        .await;
    assert!(matches!(forbidden, Err(FulfillmentError::Forbidden(_))));

    let unchanged = h.set_status(order_id, OrderStatus::Placed).await;
    assert_eq!(unchanged.status(), OrderStatus::Placed);
    assert!(h.drain().is_empty());

    let processing = h.set_status(order_id, OrderStatus::Processing).await;
    assert_eq!(processing.status(), OrderStatus::Processing);
    assert!(h.drain().contains(&Notification::OrderStatusUpdateEmail {
        user_id: h.customer.user_id,
        order_id,
        previous: OrderStatus::Placed,
        status: OrderStatus::Processing,
    }));

    let backwards = h
        .engine
        .orders
        .update_status(
            &h.admin,
            order_id,
            UpdateOrderStatusRequest {
                status: OrderStatus::Placed,
            },
        )
        .await;
    assert!(matches!(backwards, Err(FulfillmentError::InvalidState(_))));

    let cancelled = h.set_status(order_id, OrderStatus::Cancelled).await;
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn delivery_is_stamped_and_whole_return_releases_stock() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 2, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();

    let delivered = h.set_status(order_id, OrderStatus::Delivered).await;
    assert_eq!(delivered.delivered_at(), Some(h.clock_now()));

    h.clock.advance(Duration::days(3));
    let returned = h
        .engine
        .orders
        .return_order(
            &h.customer,
            order_id,
            ReturnOrderRequest {
                reason: "colour differs from photo".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(returned.status(), OrderStatus::Returned);
    assert_eq!(returned.return_reason(), Some("colour differs from photo"));
    assert_eq!(h.stock(product).await, 5);
}

// ---------------------------------------------------------------------------
// Adjustments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn partial_return_lifecycle_refunds_and_restocks() {
    let mut h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 2, 1500)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.set_status(order_id, OrderStatus::Delivered).await;
    h.drain();

    let adjustment = h
        .request_adjustment(&order, 1, AdjustmentReason::Defective, false)
        .await
        .unwrap();
    assert!(h.drain().iter().any(|n| matches!(n, Notification::Admins { .. })));

    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();
    assert_eq!(h.stock(product).await, 3);

    let picked = h
        .engine
        .adjustments
        .mark_return_picked_up(&h.admin, order_id, adjustment.id)
        .await
        .unwrap();
    assert_eq!(picked.status, AdjustmentStatus::PickedUp);
    let received = h
        .engine
        .adjustments
        .mark_return_received(&h.admin, order_id, adjustment.id)
        .await
        .unwrap();
    assert_eq!(received.status, AdjustmentStatus::Received);

    let refunded = h
        .engine
        .adjustments
        .process_return_refund(&h.admin, order_id, adjustment.id)
        .await
        .unwrap();
    assert_eq!(refunded.status, AdjustmentStatus::Refunded);
    assert_eq!(h.stock(product).await, 4);

    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.total_amount(), Money::from_cents(3000));
    assert_eq!(order.status(), OrderStatus::Delivered);

    let again = h
        .engine
        .adjustments
        .process_return_refund(&h.admin, order_id, adjustment.id)
        .await;
    assert!(matches!(again, Err(FulfillmentError::InvalidState(_))));
    assert_eq!(h.stock(product).await, 4);
}

#[tokio::test]
async fn whole_return_conflicts_with_item_return() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 2, 1500)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.set_status(order_id, OrderStatus::Delivered).await;

    h.request_adjustment(&order, 1, AdjustmentReason::Damaged, false)
        .await
        .unwrap();

    let err = h
        .engine
        .orders
        .return_order(
            &h.customer,
            order_id,
            ReturnOrderRequest {
                reason: "all of it".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::AdjustmentConflict(_)));
    assert_eq!(h.stock(product).await, 3);
}

#[tokio::test]
async fn rejection_frees_requested_quantity() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 2, 1500)]).await.unwrap();
    let order_id = order.id().unwrap();

    let first = h
        .request_adjustment(&order, 2, AdjustmentReason::OrderedByMistake, true)
        .await
        .unwrap();
    let over = h
        .request_adjustment(&order, 1, AdjustmentReason::OrderedByMistake, true)
        .await;
    assert!(matches!(
        over,
        Err(FulfillmentError::QuantityExceedsAvailable {
            requested: 1,
            available: 0
        })
    ));

    let rejected = h
        .review(order_id, first.id, ReviewDecision::Reject)
        .await
        .unwrap();
    assert_eq!(rejected.status, AdjustmentStatus::Rejected);
    assert_eq!(h.stock(product).await, 3);

    h.request_adjustment(&order, 2, AdjustmentReason::OrderedByMistake, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn return_reason_on_cancellation_is_invalid() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 2, 1500)]).await.unwrap();

    let err = h
        .request_adjustment(&order, 1, AdjustmentReason::Defective, true)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::Validation(_)));
}

#[tokio::test]
async fn cancellation_payout_is_recorded_without_moving_stock() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 3, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();

    let adjustment = h
        .request_adjustment(&order, 1, AdjustmentReason::FoundBetterPrice, true)
        .await
        .unwrap();
    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();
    assert_eq!(h.stock(product).await, 3);

    let wrong_step = h
        .engine
        .adjustments
        .process_return_refund(&h.admin, order_id, adjustment.id)
        .await;
    assert!(matches!(wrong_step, Err(FulfillmentError::InvalidState(_))));

    let refunded = h
        .engine
        .adjustments
        .mark_cancellation_refunded(&h.admin, order_id, adjustment.id)
        .await
        .unwrap();
    assert_eq!(refunded.status, AdjustmentStatus::Refunded);
    assert_eq!(h.stock(product).await, 3);

    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.total_amount(), Money::from_cents(2000));
}

#[tokio::test]
async fn cancelling_whole_line_removes_it() {
    let h = TestHarness::new();
    let lamp = h.product("Brass Lamp", 5).await;
    let pot = h.product("Clay Pot", 5).await;
    let order = h.place(&[(lamp, 2, 1000), (pot, 1, 700)]).await.unwrap();
    let order_id = order.id().unwrap();

    let adjustment = h
        .request_adjustment(&order, 2, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();
    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();

    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].product_id, pot);
    assert_eq!(order.total_amount(), Money::from_cents(700));
    assert_eq!(order.status(), OrderStatus::Placed);
    assert_eq!(h.stock(lamp).await, 5);
}

#[tokio::test]
async fn customers_cannot_review() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 5).await;
    let order = h.place(&[(product, 2, 1000)]).await.unwrap();
    let adjustment = h
        .request_adjustment(&order, 1, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();

    let err = h
        .engine
        .adjustments
        .review(
            &h.customer,
            order.id().unwrap(),
            adjustment.id,
            ReviewAdjustmentRequest {
                decision: ReviewDecision::Approve,
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::Forbidden(_)));
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_payment_needs_merchant_account() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h
        .place_as(&h.customer, &[(product, 1, 1000)], PaymentMethod::Nagad)
        .await
        .unwrap();

    let err = h
        .engine
        .payments
        .create_payment(
            &h.customer,
            order.id().unwrap(),
            CreatePaymentRequest {
                method: PaymentMethod::Nagad,
                transaction_id: Some("TX-42".to_string()),
                payment_proof: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FulfillmentError::NoMerchantAccount(MerchantAccountType::Nagad)
    ));
}

#[tokio::test]
async fn failed_payment_can_be_replaced() {
    let h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 1, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();

    let first = h.bkash_payment(order_id).await;
    let duplicate = h
        .engine
        .payments
        .create_payment(
            &h.customer,
            order_id,
            CreatePaymentRequest {
                method: PaymentMethod::Bkash,
                transaction_id: Some("dup".to_string()),
                payment_proof: None,
            },
        )
        .await;
    assert!(matches!(duplicate, Err(FulfillmentError::InvalidState(_))));

    h.verify(first, VerificationOutcome::Failed).await.unwrap();
    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Failed);
    assert_eq!(order.status(), OrderStatus::Placed);

    let second = h.bkash_payment(order_id).await;
    assert_ne!(first, second);
    let current = h
        .engine
        .payments
        .payment_for_order(&h.customer, order_id)
        .await
        .unwrap();
    assert_eq!(current.id(), Some(second));
}

#[tokio::test]
async fn verifying_twice_does_not_apply_twice() {
    let h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 1, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    let payment_id = h.bkash_payment(order_id).await;

    h.verify(payment_id, VerificationOutcome::Completed)
        .await
        .unwrap();
    let before = h.engine.orders.get_order(&h.admin, order_id).await.unwrap();

    let again = h.verify(payment_id, VerificationOutcome::Completed).await;
    assert!(matches!(again, Err(FulfillmentError::InvalidState(_))));
    let flipped = h.verify(payment_id, VerificationOutcome::Failed).await;
    assert!(matches!(flipped, Err(FulfillmentError::InvalidState(_))));

    let after = h.engine.orders.get_order(&h.admin, order_id).await.unwrap();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.payment_status(), PaymentStatus::Paid);
    assert_eq!(after.status(), OrderStatus::Processing);
}

#[tokio::test]
async fn payment_refund_voids_order_and_restocks() {
    let h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 2, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    let payment_id = h.bkash_payment(order_id).await;

    let early = h
        .engine
        .payments
        .refund_payment(
            &h.admin,
            payment_id,
            RefundPaymentRequest {
                reason: "duplicate".to_string(),
            },
        )
        .await;
    assert!(matches!(early, Err(FulfillmentError::InvalidState(_))));

    h.verify(payment_id, VerificationOutcome::Completed)
        .await
        .unwrap();
    let payment = h
        .engine
        .payments
        .refund_payment(
            &h.admin,
            payment_id,
            RefundPaymentRequest {
                reason: "customer request".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(payment.state(), PaymentState::Refunded);
    assert_eq!(payment.refund_amount(), Some(Money::from_cents(2000)));
    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn payment_refund_excludes_settled_cancellation() {
    let h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Nakshi Kantha", 5).await;
    let order = h.place(&[(product, 5, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    let payment_id = h.bkash_payment(order_id).await;
    h.verify(payment_id, VerificationOutcome::Completed)
        .await
        .unwrap();

    let adjustment = h
        .request_adjustment(&order, 2, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();
    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();
    let payout = h
        .engine
        .adjustments
        .mark_cancellation_refunded(&h.admin, order_id, adjustment.id)
        .await
        .unwrap();
    assert_eq!(payout.refund_amount, Money::from_cents(2000));

    let payment = h
        .engine
        .payments
        .refund_payment(
            &h.admin,
            payment_id,
            RefundPaymentRequest {
                reason: "customer request".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(payment.amount(), Money::from_cents(5000));
    assert_eq!(payment.refund_amount(), Some(Money::from_cents(3000)));
    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn payment_refund_conflicts_when_items_already_refunded_it_all() {
    let h = TestHarness::new();
    h.bkash_account().await;
    let product = h.product("Nakshi Kantha", 5).await;
    let order = h.place(&[(product, 2, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    let payment_id = h.bkash_payment(order_id).await;
    h.verify(payment_id, VerificationOutcome::Completed)
        .await
        .unwrap();

    let adjustment = h
        .request_adjustment(&order, 2, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();
    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();

    let err = h
        .engine
        .payments
        .refund_payment(
            &h.admin,
            payment_id,
            RefundPaymentRequest {
                reason: "customer request".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::AdjustmentConflict(_)));

    let payment = h
        .engine
        .payments
        .get_payment(&h.admin, payment_id)
        .await
        .unwrap();
    assert_eq!(payment.state(), PaymentState::Completed);
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn payments_are_private_to_their_owner() {
    let h = TestHarness::new();
    let product = h.product("Clay Pot", 5).await;
    let order = h.place(&[(product, 1, 1000)]).await.unwrap();
    let payment = h
        .engine
        .payments
        .create_payment(
            &h.customer,
            order.id().unwrap(),
            CreatePaymentRequest {
                method: PaymentMethod::CashOnDelivery,
                transaction_id: None,
                payment_proof: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(payment.state(), PaymentState::Pending);
    let payment_id = payment.id().unwrap();

    let stranger = Actor::customer(UserId::new());
    assert!(matches!(
        h.engine.payments.get_payment(&stranger, payment_id).await,
        Err(FulfillmentError::NotFound(_))
    ));
    assert!(h.engine.payments.get_payment(&h.admin, payment_id).await.is_ok());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_never_oversell() {
    let h = TestHarness::new();
    let product = h.product("Last Nakshi Kantha", 1).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = h.engine.clone();
        let buyer = Actor::customer(UserId::new());
        handles.push(tokio::spawn(async move {
            engine
                .orders
                .place_order(
                    &buyer,
                    place_request(&[(product, 1, 1000)], PaymentMethod::CashOnDelivery),
                )
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(FulfillmentError::InsufficientStock { .. }) | Err(FulfillmentError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(h.stock(product).await, 0);
}

#[tokio::test]
async fn reservations_are_conserved_through_terminal_states() {
    let h = TestHarness::new();
    let lamp = h.product("Brass Lamp", 10).await;
    let pot = h.product("Clay Pot", 10).await;

    // Partial cancellation, then whole cancellation.
    let order = h.place(&[(lamp, 4, 1000), (pot, 3, 500)]).await.unwrap();
    let order_id = order.id().unwrap();
    let adjustment = h
        .request_adjustment(&order, 1, AdjustmentReason::ChangedMind, true)
        .await
        .unwrap();
    h.review(order_id, adjustment.id, ReviewDecision::Approve)
        .await
        .unwrap();
    h.engine
        .orders
        .cancel_order(&h.customer, order_id, CancelOrderRequest::default())
        .await
        .unwrap();

    assert_eq!(h.moved(order_id, "StockReserved").await, 7);
    assert_eq!(h.moved(order_id, "StockReleased").await, 7);

    // Whole return.
    let order = h.place(&[(lamp, 2, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();
    h.set_status(order_id, OrderStatus::Delivered).await;
    h.engine
        .orders
        .return_order(
            &h.customer,
            order_id,
            ReturnOrderRequest {
                reason: "not needed".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(h.moved(order_id, "StockReserved").await, 2);
    assert_eq!(h.moved(order_id, "StockReleased").await, 2);
    assert_eq!(h.stock(lamp).await, 10);
    assert_eq!(h.stock(pot).await, 10);
}

#[tokio::test]
async fn adjustments_never_exceed_original_quantity() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 10).await;
    let order = h.place(&[(product, 5, 1000)]).await.unwrap();
    let order_id = order.id().unwrap();

    let mut approved = 0;
    for quantity in [2, 2, 2, 1, 1] {
        match h
            .request_adjustment(&order, quantity, AdjustmentReason::ChangedMind, true)
            .await
        {
            Ok(adjustment) => {
                h.review(order_id, adjustment.id, ReviewDecision::Approve)
                    .await
                    .unwrap();
                approved += quantity;
            }
            // A fully cancelled line is gone from the order.
            Err(FulfillmentError::QuantityExceedsAvailable { .. })
            | Err(FulfillmentError::NotFound(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
        assert!(approved <= 5);
    }

    assert_eq!(approved, 5);
    let order = h.engine.orders.get_order(&h.customer, order_id).await.unwrap();
    assert!(order.items().is_empty());
    assert_eq!(order.total_amount(), Money::zero());
    assert_eq!(h.stock(product).await, 10);
}

#[tokio::test]
async fn return_window_closes_exactly_after_ten_days() {
    let h = TestHarness::new();
    let product = h.product("Brass Lamp", 10).await;
    let inside = h.place(&[(product, 1, 1000)]).await.unwrap().id().unwrap();
    let boundary = h.place(&[(product, 1, 1000)]).await.unwrap().id().unwrap();
    h.set_status(inside, OrderStatus::Delivered).await;
    h.set_status(boundary, OrderStatus::Delivered).await;
    let delivered_at = h.clock_now();
    let request = || ReturnOrderRequest {
        reason: "too small".to_string(),
    };

    h.clock
        .set(delivered_at + Duration::days(10) - Duration::seconds(1));
    h.engine
        .orders
        .return_order(&h.customer, inside, request())
        .await
        .unwrap();

    h.clock.set(delivered_at + Duration::days(10));
    let err = h
        .engine
        .orders
        .return_order(&h.customer, boundary, request())
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::WindowExpired { .. }));
}
