use claims::{assert_err, assert_ok};
use client::auth::StaticTokenCredential;
use client::builder::{ClientBuilder, ClientConfig, ListOptions, ServiceClient};
use client::common::ClientError;
use client::http::TokenPlacement;
use futures::{StreamExt, TryStreamExt};
use mockito::{Matcher, Server, ServerGuard};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, PartialEq)]
struct Vault {
    name: String,
}

fn names(vaults: &[Vault]) -> Vec<&str> {
    vaults.iter().map(|vault| vault.name.as_str()).collect()
}

fn client_for(server: &ServerGuard) -> ServiceClient {
    assert_ok!(ClientBuilder::new(ClientConfig::new(server.url())).build())
}

fn listing(names: &[&str], next_link: Option<String>) -> String {
    let value: Vec<Value> = names.iter().map(|name| json!({ "name": name })).collect();
    json!({ "value": value, "nextLink": next_link }).to_string()
}

mod next_link_paging {
    use super::*;

    #[tokio::test]
    async fn test_follows_absolute_next_link() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/vaults")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(listing(&["a", "b", "c"], Some(format!("{}/vaults/page2", server.url()))))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/vaults/page2")
            .with_status(200)
            .with_body(listing(&["d", "e"], None))
            .expect(1)
            .create_async()
            .await;

        let vaults: Vec<Vault> = assert_ok!(
            client_for(&server)
                .list("vaults", ListOptions::default())
                .unwrap()
                .collect_all()
                .await
        );

        assert_eq!(names(&vaults), vec!["a", "b", "c", "d", "e"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_follows_relative_next_link_and_exposes_pages() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vaults")
            .with_status(200)
            .with_header("x-ms-request-id", "req-1")
            .with_body(listing(&["a"], Some("/vaults/page2".to_string())))
            .create_async()
            .await;
        server
            .mock("GET", "/vaults/page2")
            .with_status(200)
            .with_header("x-ms-request-id", "req-2")
            .with_body(listing(&[], None))
            .create_async()
            .await;

        let pages: Vec<_> = assert_ok!(
            client_for(&server)
                .list::<Vault>("vaults", ListOptions::default())
                .unwrap()
                .as_pages()
                .try_collect()
                .await
        );

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].metadata.request_id.as_deref(), Some("req-1"));
        assert!(pages[0].has_more());
        assert!(pages[1].is_empty());
        assert!(!pages[1].has_more());
    }

    #[tokio::test]
    async fn test_nothing_requested_until_consumed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/vaults")
            .with_status(200)
            .with_body(listing(&["a"], None))
            .expect(0)
            .create_async()
            .await;

        let pager = assert_ok!(client_for(&server).list::<Vault>("vaults", ListOptions::default()));
        drop(pager);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_max_pages_from_config() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vaults")
            .with_status(200)
            .with_body(listing(&["a"], Some(format!("{}/vaults/2", server.url()))))
            .create_async()
            .await;
        server
            .mock("GET", "/vaults/2")
            .with_status(200)
            .with_body(listing(&["b"], Some(format!("{}/vaults/3", server.url()))))
            .create_async()
            .await;
        let third = server
            .mock("GET", "/vaults/3")
            .with_status(200)
            .with_body(listing(&["c"], None))
            .expect(0)
            .create_async()
            .await;

        let config = ClientConfig::new(server.url()).with_max_pages(2);
        let client = assert_ok!(ClientBuilder::new(config).build());
        let vaults: Vec<Vault> = assert_ok!(
            client
                .list("vaults", ListOptions::default())
                .unwrap()
                .collect_all()
                .await
        );

        assert_eq!(names(&vaults), vec!["a", "b"]);
        third.assert_async().await;
    }
}

mod token_placement {
    use super::*;

    #[tokio::test]
    async fn test_token_echoed_as_query_parameter() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/secrets")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"items": [{"name": "s1"}], "cursor": "t1"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/secrets")
            .match_query(Matcher::UrlEncoded("$skiptoken".into(), "t1".into()))
            .with_status(200)
            .with_body(json!({"items": [{"name": "s2"}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let options = ListOptions {
            item_field: Some("items".into()),
            link_field: Some("cursor".into()),
            token_placement: TokenPlacement::Query("$skiptoken".into()),
            ..Default::default()
        };
        let vaults: Vec<Vault> = assert_ok!(
            client_for(&server)
                .list("secrets", options)
                .unwrap()
                .collect_all()
                .await
        );

        assert_eq!(names(&vaults), vec!["s1", "s2"]);
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_echoed_as_header() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/docs")
            .match_header("x-ms-continuation", Matcher::Missing)
            .with_status(200)
            .with_header("x-ms-continuation", "c1")
            .with_header("x-ms-request-charge", "3.5")
            .with_body(json!({"Documents": [{"name": "d1"}]}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/docs")
            .match_header("x-ms-continuation", "c1")
            .with_status(200)
            .with_body(json!({"Documents": [{"name": "d2"}]}).to_string())
            .create_async()
            .await;

        let options = ListOptions {
            item_field: Some("Documents".into()),
            token_header: Some("x-ms-continuation".into()),
            token_placement: TokenPlacement::Header("x-ms-continuation".into()),
            ..Default::default()
        };
        let pages: Vec<_> = assert_ok!(
            client_for(&server)
                .list::<Vault>("docs", options)
                .unwrap()
                .as_pages()
                .try_collect()
                .await
        );

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].metadata.request_charge, Some(3.5));
        assert_eq!(pages[1].items, vec![Vault { name: "d2".into() }]);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_expired_token_after_earlier_items() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vaults")
            .with_status(200)
            .with_body(listing(&["a", "b"], Some(format!("{}/vaults/expired", server.url()))))
            .create_async()
            .await;
        server
            .mock("GET", "/vaults/expired")
            .with_status(410)
            .with_body(r#"{"error":{"code":"ContinuationTokenExpired","message":"Token expired"}}"#)
            .create_async()
            .await;

        let mut items = client_for(&server)
            .list::<Vault>("vaults", ListOptions::default())
            .unwrap()
            .as_sequence();

        assert_eq!(assert_ok!(items.next().await.unwrap()).name, "a");
        assert_eq!(assert_ok!(items.next().await.unwrap()).name, "b");
        let error = assert_err!(items.next().await.unwrap());
        assert!(matches!(
            error,
            ClientError::InvalidContinuationToken {
                status_code: Some(410),
                ref message,
                ..
            } if message == "Token expired"
        ));
        assert!(items.next().await.is_none());
    }

    #[tokio::test]
    async fn test_first_page_service_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/vaults")
            .with_status(403)
            .with_header("x-ms-request-id", "req-403")
            .with_body(r#"{"error":{"code":"AuthorizationFailed","message":"No access"}}"#)
            .create_async()
            .await;

        let error = assert_err!(
            client_for(&server)
                .list::<Vault>("vaults", ListOptions::default())
                .unwrap()
                .collect_all()
                .await
        );

        assert_eq!(error.status_code(), Some(403));
        assert_eq!(error.error_code(), Some("AuthorizationFailed"));
        assert_eq!(error.request_id(), Some("req-403"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client = assert_ok!(ClientBuilder::new(ClientConfig::new("http://127.0.0.1:9")).build());

        let error = assert_err!(client.get::<Value>("anything").await);

        assert!(matches!(error, ClientError::Transport { .. }));
    }
}

mod pipeline_policies {
    use super::*;

    #[tokio::test]
    async fn test_bearer_api_version_and_request_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/vaults/v1")
            .match_query(Matcher::UrlEncoded("api-version".into(), "2024-01-01".into()))
            .match_header("authorization", "Bearer secret")
            .match_header(
                "x-ms-client-request-id",
                Matcher::Regex("^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$".into()),
            )
            .match_header("user-agent", "azpager-tests")
            .with_status(200)
            .with_body(r#"{"name":"v1"}"#)
            .expect(1)
            .create_async()
            .await;

        let config = ClientConfig::new(server.url())
            .with_api_version("2024-01-01")
            .with_scope("https://vault.azure.net/.default")
            .with_user_agent("azpager-tests");
        let client = assert_ok!(
            ClientBuilder::new(config)
                .credential(StaticTokenCredential::from_token("secret"))
                .build()
        );

        let vault: Vault = assert_ok!(client.get("vaults/v1").await);

        assert_eq!(vault.name, "v1");
        mock.assert_async().await;
    }
}
