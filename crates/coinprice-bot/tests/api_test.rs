//! 메시징 API 클라이언트 통합 테스트

use std::time::Duration;

use coinprice_bot::{BotApi, BotError, MessageTransport, OutgoingMessage};
use mockito::Matcher;
use serde_json::json;

const TOKEN: &str = "TESTTOKEN";

fn api(server: &mockito::Server) -> BotApi {
    BotApi::new(TOKEN)
        .with_base_url(server.url())
        .with_retry(3, Duration::from_millis(1))
}

#[tokio::test]
async fn test_get_updates_sends_offset_and_timeout() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/getUpdates")
        .match_body(Matcher::Json(json!({"timeout": 30, "offset": 10})))
        .with_status(200)
        .with_body(
            r#"{"ok": true, "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 5}, "date": 0, "text": "/query"}},
                {"update_id": 11, "edited_message": {}}
            ]}"#,
        )
        .create_async()
        .await;

    let updates = api(&server)
        .get_updates(Some(10), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].update_id, 10);
    assert!(updates[1].message.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_updates_without_offset() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/getUpdates")
        .match_body(Matcher::Json(json!({"timeout": 30})))
        .with_status(200)
        .with_body(r#"{"ok": true, "result": []}"#)
        .create_async()
        .await;

    let updates = api(&server)
        .get_updates(None, Duration::from_secs(30))
        .await
        .unwrap();

    assert!(updates.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_response_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/getMe")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .expect(3)
        .create_async()
        .await;

    let err = api(&server).get_me().await.unwrap_err();

    assert!(matches!(err, BotError::Malformed(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/getUpdates")
        .with_status(429)
        .with_body(
            r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 5", "parameters": {"retry_after": 5}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let err = api(&server)
        .get_updates(None, Duration::from_secs(30))
        .await
        .unwrap_err();

    match &err {
        BotError::Api { code, .. } => assert_eq!(*code, 429),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_me() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/botTESTTOKEN/getMe")
        .with_status(200)
        .with_body(r#"{"ok": true, "result": {"id": 99, "is_bot": true, "username": "coinprice_bot"}}"#)
        .create_async()
        .await;

    let me = api(&server).get_me().await.unwrap();

    assert_eq!(me.id, 99);
    assert_eq!(me.username.as_deref(), Some("coinprice_bot"));
}

#[tokio::test]
async fn test_send_markdown_message() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/sendMessage")
        .match_body(Matcher::Json(json!({
            "chat_id": 7,
            "text": "[BTCUSD](https://www.coinbase.com/charts)=9000",
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        })))
        .with_status(200)
        .with_body(r#"{"ok": true, "result": {"message_id": 1, "chat": {"id": 7}, "date": 0}}"#)
        .create_async()
        .await;

    api(&server)
        .send_message(&OutgoingMessage::markdown(
            7,
            "[BTCUSD](https://www.coinbase.com/charts)=9000",
        ))
        .await
        .unwrap();

    mock.assert_async().await;
}
