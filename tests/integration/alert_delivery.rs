//! Alert transports against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use pingwatch::{
    actors::scheduler::SchedulerHandle,
    alerts::AlertDispatcher,
    config::{Alert, Discord, Telegram, Webhook},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn telegram(server: &MockServer) -> Alert {
    Alert::Telegram(Telegram {
        enabled: true,
        bot_token: "TEST_TOKEN".to_string(),
        chat_id: "42".to_string(),
        api_base: server.uri(),
    })
}

async fn run_sequence(alerts: AlertDispatcher, sequence: &[bool]) {
    let monitor = create_monitor(&["10.0.0.1"], alerts).await;
    let prober = Arc::new(ScriptedProber::new());
    prober.script("10.0.0.1", sequence).await;

    let handle = SchedulerHandle::spawn(monitor, prober, manual_settings());
    for _ in sequence {
        handle.check_now().await.unwrap();
    }
    handle.shutdown().await;
}

#[tokio::test]
async fn test_telegram_alert_on_down_transition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTEST_TOKEN/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "42",
            "text": "❗ Host down:\nTest 10.0.0.1 (10.0.0.1)",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&telegram(&server)));
    assert!(alerts.is_enabled());

    run_sequence(alerts, &[true, false]).await;

    assert_eq!(wait_for_requests(&server, 1).await, 1);
}

#[tokio::test]
async fn test_no_alert_for_up_transition_or_first_probe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&telegram(&server)));

    // first probe down, then recovery: neither is a down-transition
    run_sequence(alerts, &[false, true, true]).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(wait_for_requests(&server, 1).await, 0);
}

#[tokio::test]
async fn test_one_alert_per_down_transition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&telegram(&server)));

    run_sequence(alerts, &[true, false, false, true, false, false]).await;

    assert_eq!(wait_for_requests(&server, 2).await, 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(wait_for_requests(&server, 3).await, 2);
}

#[tokio::test]
async fn test_server_error_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&telegram(&server)));
    let monitor = create_monitor(&["a"], alerts).await;
    let prober = Arc::new(ScriptedProber::new());
    prober.script("a", &[true, false, true]).await;

    let handle = SchedulerHandle::spawn(monitor.clone(), prober, manual_settings());
    for _ in 0..3 {
        handle.check_now().await.unwrap();
    }

    assert_eq!(wait_for_requests(&server, 1).await, 1);
    assert_eq!(monitor.events().await.len(), 2);
    assert_eq!(
        monitor.status("a").await.unwrap().current_reachable,
        Some(true)
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_alert_endpoint_is_swallowed() {
    let alerts = AlertDispatcher::from_config(Some(&Alert::Telegram(Telegram {
        enabled: true,
        bot_token: "TOKEN".to_string(),
        chat_id: "1".to_string(),
        api_base: "http://127.0.0.1:1".to_string(),
    })));

    let monitor = create_monitor(&["a"], alerts).await;
    let prober = Arc::new(ScriptedProber::new());
    prober.script("a", &[true, false]).await;

    let handle = SchedulerHandle::spawn(monitor.clone(), prober, manual_settings());
    handle.check_now().await.unwrap();
    handle.check_now().await.unwrap();

    assert_eq!(monitor.events().await.len(), 1);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_disabled_or_incomplete_telegram_sends_nothing() {
    let server = MockServer::start().await;

    let disabled = Telegram {
        enabled: false,
        bot_token: "TOKEN".to_string(),
        chat_id: "1".to_string(),
        api_base: server.uri(),
    };
    let missing_chat = Telegram {
        enabled: true,
        chat_id: String::new(),
        ..disabled.clone()
    };

    assert!(!AlertDispatcher::from_config(Some(&Alert::Telegram(disabled))).is_enabled());
    assert!(!AlertDispatcher::from_config(Some(&Alert::Telegram(missing_chat))).is_enabled());
    assert!(!AlertDispatcher::from_config(None).is_enabled());
}

#[tokio::test]
async fn test_webhook_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/pingwatch"))
        .and(body_partial_json(json!({
            "target": "Test 10.0.0.1",
            "address": "10.0.0.1",
            "status": "down",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&Alert::Webhook(Webhook {
        url: format!("{}/hooks/pingwatch", server.uri()),
    })));

    run_sequence(alerts, &[true, false]).await;

    assert_eq!(wait_for_requests(&server, 1).await, 1);
}

#[tokio::test]
async fn test_discord_embed_mentions_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/abc"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let alerts = AlertDispatcher::from_config(Some(&Alert::Discord(Discord {
        url: format!("{}/api/webhooks/1/abc", server.uri()),
        user_id: Some("1234".to_string()),
    })));

    run_sequence(alerts, &[true, false]).await;

    assert_eq!(wait_for_requests(&server, 1).await, 1);
    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();

    let content = body["content"].as_str().unwrap();
    assert!(content.contains("<@1234>"));
    assert!(content.contains("10.0.0.1"));
    assert_eq!(body["embeds"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_hanging_transport_does_not_stall_engine() {
    let alerts = AlertDispatcher::new(Arc::new(HangingTransport));
    let monitor = create_monitor(&["a"], alerts).await;
    let prober = Arc::new(ScriptedProber::new());
    prober.script("a", &[true, false, true, false]).await;

    let handle = SchedulerHandle::spawn(monitor.clone(), prober, manual_settings());

    let rounds = async {
        for _ in 0..4 {
            handle.check_now().await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(2), rounds)
        .await
        .expect("rounds should not wait for alert delivery");

    assert_eq!(monitor.events().await.len(), 3);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_recording_transport_receives_down_alerts() {
    let (alerts, mut received) = RecordingTransport::dispatcher();
    let monitor = create_monitor(&["a", "b"], alerts).await;
    let prober = Arc::new(ScriptedProber::new());
    prober.script("a", &[true, false]).await;
    prober.script("b", &[false, true]).await;

    let handle = SchedulerHandle::spawn(monitor, prober, manual_settings());
    handle.check_now().await.unwrap();
    handle.check_now().await.unwrap();

    let alerts = drain_alerts(&mut received, Duration::from_millis(200)).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].target.address, "a");

    handle.shutdown().await;
}
