//! Integration tests for notification dispatch.
//!
//! Domain services write events to an in-memory store; the dispatcher reads
//! them back and delivers through an in-memory or HTTP mailer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::UserId;
use domain::{
    AccountType, Actor, AdvanceStatus, Contact, CreateOrderDraft, Money, OfferService, Order,
    OrderService, ShippingInfo, SubmitOffer,
};
use notifications::{Email, HttpMailer, InMemoryMailer, Mailer, NotificationDispatcher};
use record_store::InMemoryRecordStore;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user(name: &str, account_type: AccountType) -> Actor {
    Actor::new(
        Contact::new(UserId::new(), name, format!("{name}@example.com")),
        account_type,
    )
}

fn bid() -> SubmitOffer {
    SubmitOffer {
        unit_cost: Some(Money::from_cents(500)),
        projected_cost: Some(Money::from_cents(5_000)),
        projected_units: Some(10),
        shipping_cost: Some(Money::from_cents(700)),
        lead_time_days: Some(12),
    }
}

async fn drafted(store: &InMemoryRecordStore, creator: &Actor) -> Order {
    let due = (Utc::now() + chrono::Duration::days(30)).date_naive();
    OrderService::new(store.clone())
        .create_draft(CreateOrderDraft::new("Camera mount", 10, due), creator)
        .await
        .unwrap()
}

mod in_memory {
    use super::*;

    #[tokio::test]
    async fn offer_flow_notifies_each_party() {
        let store = InMemoryRecordStore::new();
        let mailer = InMemoryMailer::new();
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));
        let offers = OfferService::new(store.clone());

        let creator = user("ada", AccountType::Creator);
        let forge = user("forge", AccountType::Manufacturer);
        let mill = user("mill", AccountType::Manufacturer);
        let order = drafted(&store, &creator).await;

        let won = offers.submit_offer(order.id, bid(), &forge).await.unwrap();
        let lost = offers.submit_offer(order.id, bid(), &mill).await.unwrap();
        offers.decline_offer(lost.id, &creator).await.unwrap();
        offers.accept_offer(won.id, &creator).await.unwrap();

        let stats = dispatcher.drain().await.unwrap();
        assert_eq!(stats.events, 5);
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.failed, 0);

        assert_eq!(mailer.sent_to("ada@example.com").await.len(), 2);
        let forge_mail = mailer.sent_to("forge@example.com").await;
        assert_eq!(forge_mail.len(), 1);
        assert!(forge_mail[0].subject.contains("accepted"));
        let mill_mail = mailer.sent_to("mill@example.com").await;
        assert!(mill_mail[0].subject.contains("declined"));

        let again = dispatcher.drain().await.unwrap();
        assert_eq!(again.events, 0);
        assert_eq!(mailer.sent().await.len(), 4);
    }

    #[tokio::test]
    async fn shipped_order_notifies_creator_with_tracking() {
        let store = InMemoryRecordStore::new();
        let mailer = InMemoryMailer::new();
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));
        let orders = OrderService::new(store.clone());
        let offers = OfferService::new(store.clone());

        let creator = user("ada", AccountType::Creator);
        let forge = user("forge", AccountType::Manufacturer);
        let order = drafted(&store, &creator).await;
        let offer = offers.submit_offer(order.id, bid(), &forge).await.unwrap();
        offers.accept_offer(offer.id, &creator).await.unwrap();
        dispatcher.drain().await.unwrap();
        let before = mailer.sent_to("ada@example.com").await.len();

        for _ in 0..4 {
            orders
                .advance_status(
                    order.id,
                    AdvanceStatus {
                        shipping: Some(ShippingInfo {
                            carrier: "FedEx".to_string(),
                            tracking_number: Some("7712".to_string()),
                        }),
                    },
                    &forge,
                )
                .await
                .unwrap();
        }
        dispatcher.drain().await.unwrap();

        let mail = mailer.sent_to("ada@example.com").await;
        assert_eq!(mail.len(), before + 1);
        let shipped = mail.last().unwrap();
        assert!(shipped.text.contains("Carrier: FedEx"));
        assert!(shipped.text.contains("Tracking number: 7712"));
    }

    #[tokio::test]
    async fn mailer_failure_does_not_stall_the_outbox() {
        let store = InMemoryRecordStore::new();
        let mailer = InMemoryMailer::new();
        mailer.set_fail_on_send(true).await;
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));

        let creator = user("ada", AccountType::Creator);
        let order = drafted(&store, &creator).await;
        OfferService::new(store.clone())
            .submit_offer(order.id, bid(), &user("forge", AccountType::Manufacturer))
            .await
            .unwrap();

        let stats = dispatcher.drain().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(dispatcher.position().await.unwrap(), 2);

        mailer.set_fail_on_send(false).await;
        let stats = dispatcher.drain().await.unwrap();
        assert_eq!(stats.events, 0);
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn small_batches_resume_from_checkpoint() {
        let store = InMemoryRecordStore::new();
        let mailer = InMemoryMailer::new();
        let creator = user("ada", AccountType::Creator);
        let order = drafted(&store, &creator).await;
        let offers = OfferService::new(store.clone());
        for name in ["a", "b", "c"] {
            offers
                .submit_offer(order.id, bid(), &user(name, AccountType::Manufacturer))
                .await
                .unwrap();
        }

        let dispatcher =
            NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone())).with_batch_size(2);
        let first = dispatcher.run_once().await.unwrap();
        assert_eq!(first.events, 2);
        assert_eq!(dispatcher.position().await.unwrap(), 2);

        let rest = dispatcher.drain().await.unwrap();
        assert_eq!(rest.events, 2);
        assert_eq!(mailer.sent().await.len(), 3);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let store = InMemoryRecordStore::new();
        let mailer = InMemoryMailer::new();
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(mailer.clone()));
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = tokio::spawn(dispatcher.run(Duration::from_millis(10), rx));

        let creator = user("ada", AccountType::Creator);
        let order = drafted(&store, &creator).await;
        OfferService::new(store.clone())
            .submit_offer(order.id, bid(), &user("forge", AccountType::Manufacturer))
            .await
            .unwrap();

        let mut delivered = false;
        for _ in 0..100 {
            if !mailer.sent().await.is_empty() {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(delivered);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

mod http {
    use super::*;

    fn email() -> Email {
        Email {
            to: "ada@example.com".to_string(),
            subject: "New offer".to_string(),
            text: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_json_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "from": "orders@foundry.test",
                "to": "ada@example.com",
                "subject": "New offer"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mailer =
            HttpMailer::new(format!("{}/send", server.uri()), "secret", "orders@foundry.test")
                .unwrap();
        mailer.send(&email()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(server.uri(), "secret", "orders@foundry.test").unwrap();
        let err = mailer.send(&email()).await.unwrap_err();
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("bad recipient"));
    }
}
