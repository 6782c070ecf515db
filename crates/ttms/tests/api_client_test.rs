//! ApiClient against a mocked upstream endpoint.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ttms::api::{ApiClient, Entity, Params};
use ttms::config::ApiConfig;
use ttms::models::Course;
use ttms::TtmsError;

const ENDPOINT: &str = "/ttms/web_man_webservice_json.cgi";

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: format!("{}{}", server.uri(), ENDPOINT),
        ..Default::default()
    })
    .expect("client builds")
}

async fn mount(server: &MockServer, entity: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("entity", entity))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bare_array() {
    let server = MockServer::start().await;
    mount(
        &server,
        "subjek",
        ResponseTemplate::new(200).set_body_json(json!([
            {"kod_subjek": "SCSJ1013", "nama_subjek": "PROGRAMMING TECHNIQUE I"},
            {"kod_subjek": "SCSI1113", "nama_subjek": "DATABASE"},
            {"kod_subjek": "SCSR1013", "nama_subjek": "DIGITAL LOGIC"}
        ])),
    )
    .await;

    let records = client(&server)
        .fetch(Entity::Subjek, &Params::new().term("2025/2026", "1"))
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_term_params_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("entity", "subjek"))
        .and(query_param("sesi", "2025/2026"))
        .and(query_param("semester", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server)
        .fetch(Entity::Subjek, &Params::new().term("2025/2026", "1"))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_nested_under_entity_and_data() {
    let server = MockServer::start().await;
    mount(
        &server,
        "subjek",
        ResponseTemplate::new(200).set_body_json(json!({"subjek": [{"kod_subjek": "C1"}]})),
    )
    .await;
    mount(
        &server,
        "subjek_pensyarah",
        ResponseTemplate::new(200).set_body_json(json!({"data": [{"nama": "A"}, {"nama": "B"}]})),
    )
    .await;

    let client = client(&server);
    let courses: Vec<Course> = client.fetch_as(Entity::Subjek, &Params::new()).await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].code, "C1");

    let assignments = client
        .fetch(Entity::SubjekPensyarah, &Params::new())
        .await
        .unwrap();
    assert_eq!(assignments.len(), 2);
}

#[tokio::test]
async fn test_empty_body_is_no_records() {
    let server = MockServer::start().await;
    mount(&server, "sesisemester", ResponseTemplate::new(200).set_body_string("  \n")).await;

    let client = client(&server);
    let records = client
        .fetch(Entity::SesiSemester, &Params::new())
        .await
        .unwrap();
    assert!(records.is_empty());

    let soft = client.request(Entity::SesiSemester, &Params::new()).await;
    assert!(soft.is_empty());
    assert!(!soft.needs_reauth());
}

#[tokio::test]
async fn test_error_page_requires_reauth() {
    let server = MockServer::start().await;
    mount(
        &server,
        "pelajar",
        ResponseTemplate::new(200).set_body_string(
            "<html><head><title>TTMS Web Service</title></head><body>The most simple ...</body></html>",
        ),
    )
    .await;
    mount(
        &server,
        "subjek_pelajar",
        ResponseTemplate::new(200)
            .set_body_string("The most simple way to use this web service is ..."),
    )
    .await;

    let client = client(&server);
    let params = Params::new().with("session_id", "stale");

    let err = client.fetch(Entity::Pelajar, &params).await.unwrap_err();
    assert!(matches!(err, TtmsError::AuthRequired { .. }));
    assert!(err.to_string().contains("TTMS Web Service"));

    let soft = client.request(Entity::SubjekPelajar, &params).await;
    assert!(soft.is_empty());
    assert!(soft.needs_reauth());
}

#[tokio::test]
async fn test_server_error_is_soft() {
    let server = MockServer::start().await;
    mount(&server, "subjek", ResponseTemplate::new(500)).await;

    let client = client(&server);
    let err = client.fetch(Entity::Subjek, &Params::new()).await.unwrap_err();
    assert!(matches!(err, TtmsError::HttpStatus { status: 500, .. }));
    assert!(err.is_soft());

    let soft = client.request(Entity::Subjek, &Params::new()).await;
    assert!(soft.is_empty());
    assert!(!soft.needs_reauth());
}

#[tokio::test]
async fn test_unexpected_shapes() {
    let server = MockServer::start().await;
    mount(
        &server,
        "subjek",
        ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "count": 3})),
    )
    .await;
    mount(
        &server,
        "sesisemester",
        ResponseTemplate::new(200).set_body_string("{not json"),
    )
    .await;

    let client = client(&server);
    let err = client.fetch(Entity::Subjek, &Params::new()).await.unwrap_err();
    assert!(matches!(err, TtmsError::UnexpectedShape { .. }));

    let err = client
        .fetch(Entity::SesiSemester, &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TtmsError::Malformed { .. }));
    assert!(!err.needs_reauth());
}

#[tokio::test]
async fn test_unreachable_upstream() {
    let client = ApiClient::new(&ApiConfig {
        base_url: "http://127.0.0.1:9/ws.cgi".to_string(),
        connect_timeout_secs: 1,
        timeout_secs: 2,
        ..Default::default()
    })
    .unwrap();

    let err = client.fetch(Entity::Subjek, &Params::new()).await.unwrap_err();
    assert!(matches!(err, TtmsError::Network { .. }));
}
