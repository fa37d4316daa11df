mod common;

use common::Harness;
use talk_client::{InvocationError, Sticker};

#[tokio::test]
async fn privileged_calls_fail_closed_without_network() {
    let h = Harness::new();
    let client = h.client();

    assert!(matches!(client.poll(10).await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.poll_from(0, 10).await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.refresh_contacts().await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.refresh_groups().await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.send_text("u1", "hi").await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(
        client.send_sticker("u1", &Sticker::default()).await,
        Err(InvocationError::Unauthenticated),
    ));
    assert!(matches!(
        client.send_image_url("u1", "http://img", None).await,
        Err(InvocationError::Unauthenticated),
    ));
    assert!(matches!(client.leave_group("g1").await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.message_box("u1").await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.recent_messages("u1", 5).await, Err(InvocationError::Unauthenticated)));
    assert!(matches!(client.refresh_rooms().await, Err(InvocationError::Unauthenticated)));

    assert!(h.service.calls().is_empty());
    assert!(client.auth_token().is_none());
}

#[tokio::test]
async fn lookups_on_an_empty_cache_return_none() {
    let h = Harness::new();
    let client = h.client();

    assert!(client.contacts().is_empty());
    assert!(client.groups().is_empty());
    assert!(client.profile().is_none());
    assert!(client.resolve("anyone").is_none());
}
