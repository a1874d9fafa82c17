//! HTTP-level tests for the Businessmap client against a mock server.

use mockito::{Matcher, Server};
use serde_json::json;

use boardgate::domain::errors::DomainError;
use boardgate::domain::models::{
    CardUpdate, InstanceDescriptor, ResolutionStrategy, ResolvedInstance,
};
use boardgate::domain::ports::{BoardClient, ClientFactory};
use boardgate::infrastructure::businessmap::{
    BusinessMapClient, BusinessMapClientConfig, HttpClientFactory,
};

const TOKEN: &str = "test-api-key";

fn instance(url: &str, read_only: bool) -> ResolvedInstance {
    ResolvedInstance {
        descriptor: InstanceDescriptor {
            name: "mock".to_string(),
            api_url: format!("{url}/"),
            api_token_env: "UNUSED".to_string(),
            read_only_mode: read_only,
            default_workspace_id: None,
            description: None,
        },
        api_token: TOKEN.to_string(),
        strategy: ResolutionStrategy::Explicit,
    }
}

fn client(server: &Server) -> BusinessMapClient {
    BusinessMapClient::new(&instance(&server.url(), false), &BusinessMapClientConfig::default())
        .expect("client should build")
}

#[tokio::test]
async fn test_initialize_sends_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/me")
        .match_header("apikey", TOKEN)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"user_id": 9, "username": "agent"}}).to_string())
        .create_async()
        .await;

    let user = client(&server).initialize().await.unwrap();

    assert_eq!(user.user_id, 9);
    assert_eq!(user.username.as_deref(), Some("agent"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_card_unwraps_envelope() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cards/42")
        .with_status(200)
        .with_body(
            json!({"data": {"card_id": 42, "title": "Widget", "board_id": 3, "extra": true}})
                .to_string(),
        )
        .create_async()
        .await;

    let card = client(&server).get_card(42).await.unwrap();

    assert_eq!(card.card_id, 42);
    assert_eq!(card.title, "Widget");
    assert_eq!(card.board_id, Some(3));
}

#[tokio::test]
async fn test_not_found_maps_to_resource_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/boards/7")
        .with_status(404)
        .with_body(r#"{"error":{"message":"not found"}}"#)
        .create_async()
        .await;

    let err = client(&server).get_board(7).await.unwrap_err();

    assert_eq!(
        err,
        DomainError::NotFound {
            resource: "Board".to_string(),
            id: 7
        }
    );
}

#[tokio::test]
async fn test_auth_and_rate_limit_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/workspaces/1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("GET", "/workspaces/2")
        .with_status(429)
        .create_async()
        .await;

    let client = client(&server);
    assert_eq!(
        client.get_workspace(1).await.unwrap_err(),
        DomainError::Unauthorized("mock".to_string())
    );
    assert_eq!(
        client.get_workspace(2).await.unwrap_err(),
        DomainError::RateLimited("mock".to_string())
    );
}

#[tokio::test]
async fn test_server_error_body_is_scrubbed() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/cards/5")
        .with_status(500)
        .with_body(format!("internal error, apikey: {TOKEN}"))
        .create_async()
        .await;

    let err = client(&server).delete_card(5).await.unwrap_err();

    match err {
        DomainError::ApiRequestFailed { status, message } => {
            assert_eq!(status, Some(500));
            assert!(!message.contains(TOKEN), "token leaked: {message}");
        }
        other => panic!("Expected ApiRequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_archive_and_list_requests() {
    let mut server = Server::new_async().await;
    let archive = server
        .mock("PATCH", "/workspaces/12")
        .match_body(Matcher::Json(json!({"is_archived": 1})))
        .with_status(200)
        .with_body(r#"{"data":{}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/boards")
        .match_query(Matcher::UrlEncoded("workspace_ids".into(), "12".into()))
        .with_status(200)
        .with_body(
            json!({"data": [
                {"board_id": 1, "workspace_id": 12, "name": "One", "is_archived": 0},
                {"board_id": 2, "workspace_id": 12, "name": "Two", "is_archived": 1}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/cards")
        .match_query(Matcher::UrlEncoded("board_ids".into(), "1".into()))
        .with_status(200)
        .with_body(json!({"data": {"data": [{"card_id": 5, "title": "Five"}]}}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/cards/5/children")
        .with_status(200)
        .with_body(json!({"data": [{"card_id": 6}, {"card_id": 7}]}).to_string())
        .create_async()
        .await;

    let client = client(&server);
    client.archive_workspace(12).await.unwrap();
    let boards = client.list_boards(12).await.unwrap();
    let cards = client.list_cards(1).await.unwrap();
    let children = client.list_card_children(5).await.unwrap();

    archive.assert_async().await;
    assert_eq!(boards.len(), 2);
    assert_eq!(boards[1].is_archived, 1);
    assert_eq!(cards[0].title, "Five");
    assert_eq!(children, vec![6, 7]);
}

#[tokio::test]
async fn test_update_card_sends_only_set_fields() {
    let mut server = Server::new_async().await;
    server
        .mock("PATCH", "/cards/8")
        .match_body(Matcher::Json(json!({"column_id": 3})))
        .with_status(200)
        .with_body(json!({"data": {"card_id": 8, "title": "Moved"}}).to_string())
        .create_async()
        .await;

    let update = CardUpdate {
        column_id: Some(3),
        ..CardUpdate::default()
    };
    let card = client(&server).update_card(8, &update).await.unwrap();

    assert_eq!(card.title, "Moved");
}

#[tokio::test]
async fn test_read_only_client_refuses_writes_without_request() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let factory = HttpClientFactory::default();
    let client = factory.create(&instance(&server.url(), true)).unwrap();

    assert!(client.is_read_only());
    let err = client.delete_board(1).await.unwrap_err();
    assert!(matches!(err, DomainError::ReadOnlyInstance { .. }));
    delete.assert_async().await;
}
