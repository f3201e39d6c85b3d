use chrono::NaiveDate;
use httpmock::{Method::POST, MockServer};
use market_digest::{Digest, DigestError, Dispatcher, Recipient, WebhookDispatcher};
use serde_json::json;
use url::Url;

fn digest() -> Digest {
    Digest::new(
        NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
        "Apple led the tape.",
        3,
    )
}

fn endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}/send", server.base_url())).unwrap()
}

#[tokio::test]
async fn offline_posts_one_message_per_recipient() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/send")
            .header("authorization", "Bearer relay-token")
            .json_body(json!({
                "from": "Morning Desk",
                "to": {"email": "ada@example.com", "display_name": "Ada"},
                "subject": "Market News Summary Today - October 9, 2025",
                "date": "2025-10-09",
                "content": "Apple led the tape.",
                "article_count": 3
            }));
        then.status(202);
    });

    let dispatcher = WebhookDispatcher::builder(endpoint(&server))
        .bearer_token("relay-token")
        .sender("Morning Desk")
        .build()
        .unwrap();
    let contact = Recipient::new("u1", "ada@example.com", "Ada").contact();

    dispatcher.send(&contact, &digest()).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn offline_rejected_delivery_is_a_delivery_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/send");
        then.status(500);
    });

    let dispatcher = WebhookDispatcher::builder(endpoint(&server)).build().unwrap();
    let contact = Recipient::new("u2", "bob@example.com", "Bob").contact();

    let err = dispatcher.send(&contact, &digest()).await.unwrap_err();
    mock.assert_calls(1);
    match err {
        DigestError::Delivery(msg) => assert!(msg.contains("500"), "{msg}"),
        other => panic!("expected Delivery, got {other:?}"),
    }
}
