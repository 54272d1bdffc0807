//! Webhook sinks against a mock HTTP server

mod common;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{at, feed_with};
use feedrelay::sinks::{
    formatter, JsonWebhookSink, PostLayout, PostSink, Sink, SinkError, WebhookClient,
    WebhookConfig,
};

fn client(server: &MockServer, route: &str) -> WebhookClient {
    WebhookClient::new(
        WebhookConfig::new(format!("{}{route}", server.uri()))
            .with_auth_token("secret")
            .with_retries(2, 10),
    )
    .unwrap()
}

#[tokio::test]
async fn test_post_sink_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "msg_type": "post",
            "content": {
                "post": {
                    "zh_cn": {
                        "title": "Test Feed",
                        "content": [[
                            { "tag": "text", "text": "\n" },
                            { "tag": "a", "text": "A: summary of A", "href": "https://example.com/A" },
                            { "tag": "text", "text": "\n\n" }
                        ]]
                    }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = PostSink::new("digest", client(&server, "/hook")).with_layout(PostLayout::Digest);
    sink.send(&feed_with(at(0), &["A"])).await.unwrap();
}

#[tokio::test]
async fn test_post_sink_caps_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = PostSink::new("entries", client(&server, "/hook")).with_max_items(2);
    let message = sink.render(&feed_with(at(0), &["A", "B", "C"]));
    assert_eq!(message.content.post["zh_cn"].content.len(), 2);

    sink.send(&feed_with(at(0), &["A", "B", "C"])).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["content"]["post"]["zh_cn"]["content"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_rejected_response_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 19021, "msg": "sign match fail" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = PostSink::new("bot", client(&server, "/hook"));
    let err = sink.send(&feed_with(at(0), &["A"])).await.unwrap_err();

    match err {
        SinkError::Rejected { code, message } => {
            assert_eq!(code, 19021);
            assert_eq!(message, "sign match fail");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// 4xx is permanent: one request only
#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = JsonWebhookSink::new("json", client(&server, "/hook"));
    let err = sink.send(&feed_with(at(0), &["A"])).await.unwrap_err();

    assert!(matches!(err, SinkError::Status { status: 400, .. }));
}

/// 5xx is retried until it succeeds
#[tokio::test]
async fn test_server_error_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = JsonWebhookSink::new("json", client(&server, "/hook"));
    sink.send(&feed_with(at(0), &["A"])).await.unwrap();
}

#[tokio::test]
async fn test_json_sink_payload_with_formatter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(json!({
            "source": "blog",
            "title": "Test Feed",
            "items": [{ "title": "A", "summary": "pitch" }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = feed_with(at(0), &["A", "B"]);
    feed.items[0].summary = "<h3>A</h3><p>pitch</p>".to_string();

    let mut sink = JsonWebhookSink::new("blog", client(&server, "/json")).with_max_items(1);
    sink.set_formatter(formatter::best_blogs());
    sink.send(&feed).await.unwrap();

    // the caller's feed is not modified
    assert_eq!(feed.items[0].summary, "<h3>A</h3><p>pitch</p>");
}
