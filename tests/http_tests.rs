use anyhow::Result;
use awsusers::config::AuditConfig;
use awsusers::directory::Directory;
use awsusers::error::RemoteError;
use awsusers::http::QueryClient;
use awsusers::iam::IamDirectory;
use awsusers::pipeline::Auditor;
use awsusers::progress::SilentReporter;
use awsusers::retry::RetryConfig;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests whose form body does not carry `Marker`
struct WithoutMarker;

impl Match for WithoutMarker {
    fn matches(&self, request: &Request) -> bool {
        !String::from_utf8_lossy(&request.body).contains("Marker=")
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        initial_backoff_ms: 5,
        backoff_factor: 2.0,
        max_backoff_ms: 20,
        add_jitter: false,
    }
}

fn directory(server: &MockServer) -> Result<IamDirectory> {
    Ok(IamDirectory::new(&server.uri(), Duration::from_secs(2))?.with_retry_config(fast_retry()))
}

fn users_page(names: &[&str], marker: Option<&str>) -> String {
    let members: String = names
        .iter()
        .map(|n| {
            format!(
                "<member><UserName>{}</UserName><Arn>arn:aws:iam::1:user/{}</Arn></member>",
                n, n
            )
        })
        .collect();
    let tail = match marker {
        Some(m) => format!("<IsTruncated>true</IsTruncated><Marker>{}</Marker>", m),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    format!(
        "<ListUsersResponse><ListUsersResult><Users>{}</Users>{}</ListUsersResult></ListUsersResponse>",
        members, tail
    )
}

fn groups_page(groups: &[&str]) -> String {
    let members: String = groups
        .iter()
        .map(|g| format!("<member><GroupName>{}</GroupName></member>", g))
        .collect();
    format!(
        "<ListGroupsForUserResponse><ListGroupsForUserResult><Groups>{}</Groups>\
         <IsTruncated>false</IsTruncated></ListGroupsForUserResult></ListGroupsForUserResponse>",
        members
    )
}

const THROTTLED: &str = "<ErrorResponse><Error><Type>Sender</Type><Code>Throttling</Code>\
    <Message>Rate exceeded</Message></Error></ErrorResponse>";

#[tokio::test]
async fn test_query_client_rejects_invalid_endpoint() {
    assert!(QueryClient::new("not a url", Duration::from_millis(500)).is_err());
}

#[tokio::test]
async fn test_directory_wraps_existing_client() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListUsers"))
        .respond_with(ResponseTemplate::new(200).set_body_string(users_page(&["alice"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueryClient::new(&server.uri(), Duration::from_secs(2))?;
    assert_eq!(client.endpoint().as_str(), format!("{}/", server.uri()));

    let directory = IamDirectory::from_client(client.with_retry_config(RetryConfig::no_retry()));
    let page = directory.list_principals_page(None).await?;

    assert_eq!(page.principals[0].name, "alice");
    Ok(())
}

#[tokio::test]
async fn test_post_action_sends_form_parameters() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListGroupsForUser"))
        .and(body_string_contains("Version=2010-05-08"))
        .and(body_string_contains("UserName=svc%2Bci%40example"))
        .respond_with(ResponseTemplate::new(200).set_body_string(groups_page(&["ci"])))
        .expect(1)
        .mount(&server)
        .await;

    let groups = directory(&server)?
        .list_groups_for_principal("svc+ci@example")
        .await?;

    assert_eq!(groups, vec!["ci"]);
    Ok(())
}

#[tokio::test]
async fn test_list_users_follows_markers() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListUsers"))
        .and(WithoutMarker)
        .respond_with(
            ResponseTemplate::new(200).set_body_string(users_page(&["alice", "bob"], Some("next-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Marker=next-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(users_page(&["carol"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let directory = directory(&server)?;
    let first = directory.list_principals_page(None).await?;
    assert_eq!(first.principals.len(), 2);
    assert_eq!(first.next_token.as_deref(), Some("next-1"));

    let second = directory.list_principals_page(first.next_token).await?;
    assert_eq!(second.principals[0].name, "carol");
    assert_eq!(second.principals[0].arn.as_deref(), Some("arn:aws:iam::1:user/carol"));
    assert!(second.next_token.is_none());
    Ok(())
}

#[tokio::test]
async fn test_throttling_is_retried() -> Result<()> {
    let server = MockServer::start().await;

    // The first two attempts are throttled, the third succeeds
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(THROTTLED))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(groups_page(&["admins"])))
        .expect(1)
        .mount(&server)
        .await;

    let groups = directory(&server)?.list_groups_for_principal("alice").await?;
    assert_eq!(groups, vec!["admins"]);
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<ErrorResponse><Error><Code>NoSuchEntity</Code>\
             <Message>The user with name ghost cannot be found.</Message></Error></ErrorResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = directory(&server)?
        .list_groups_for_principal("ghost")
        .await
        .unwrap_err();

    match err.downcast_ref::<RemoteError>() {
        Some(RemoteError::Api { status, code, .. }) => {
            assert_eq!(*status, 404);
            assert_eq!(code, "NoSuchEntity");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = directory(&server)?
        .list_principals_page(None)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::UnexpectedStatus { status: 503, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_audit_against_mock_iam() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListUsers"))
        .and(WithoutMarker)
        .respond_with(
            ResponseTemplate::new(200).set_body_string(users_page(&["alice", "bob"], Some("p2"))),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListUsers"))
        .and(body_string_contains("Marker=p2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(users_page(&["carol"], None)))
        .mount(&server)
        .await;

    for (user, groups) in [("alice", vec!["admins"]), ("carol", vec!["interns"])] {
        Mock::given(method("POST"))
            .and(body_string_contains("Action=ListGroupsForUser"))
            .and(body_string_contains(format!("UserName={}", user)))
            .respond_with(ResponseTemplate::new(200).set_body_string(groups_page(&groups)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = AuditConfig {
        name_filters: vec!["^a".to_string(), "^c".to_string()],
        group_filters: vec!["^adm".to_string()],
        concurrency_limit: 2,
    }
    .validate()?;

    let directory = directory(&server)?;
    let report = Auditor::new(&directory, config).collect(&SilentReporter).await?;

    assert_eq!(report.names(), vec!["alice"]);
    assert_eq!(
        report.entries[0].principal.arn.as_deref(),
        Some("arn:aws:iam::1:user/alice")
    );
    Ok(())
}

#[tokio::test]
async fn test_unexpected_document_is_malformed() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = directory(&server)?
        .list_principals_page(None)
        .await
        .unwrap_err();

    match err.downcast_ref::<RemoteError>() {
        Some(RemoteError::MalformedResponse { action, .. }) => assert_eq!(action, "ListUsers"),
        other => panic!("Expected malformed response, got {:?}", other),
    }
    Ok(())
}
