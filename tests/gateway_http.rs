use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};

use readable_tui::api::{Client, ClientConfig};
use readable_tui::data::Services;
use readable_tui::error::GatewayError;
use readable_tui::model::{CommentEdit, NewComment, NewPost, PostEdit, VoteDirection};
use readable_tui::store::Store;
use readable_tui::sync::Synchronizer;

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    body: String,
    headers: Vec<(String, String)>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

const POST_JSON: &str = r#"{"id":"8xf0y6ziyjabvozdd253nd","timestamp":1467166872634,"title":"Udacity is the best place to learn React","body":"Everyone says so after all.","author":"thingtwo","category":"react","voteScore":6,"deleted":false,"commentCount":2}"#;
const COMMENT_JSON: &str = r#"{"id":"894tuq4ut84ut8v4t8wun89g","parentId":"8xf0y6ziyjabvozdd253nd","timestamp":1468166872634,"body":"Hi there! I am a COMMENT.","author":"thingtwo","voteScore":6,"deleted":false,"parentDeleted":false}"#;

/// Fake board server answering like the stock Readable API.
struct FakeBoard {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeBoard {
    fn start() -> Self {
        Self::start_with(route)
    }

    fn start_with(handler: fn(&str, &str, &str) -> (u16, String)) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind fake board");
        let addr = server.server_addr().to_ip().expect("tcp listener");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body,
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                };
                let (status, payload) = handler(&recorded.method, &recorded.url, &recorded.body);
                log.lock().push(recorded);
                let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("static header");
                let response = Response::from_string(payload)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    fn client(&self) -> Client {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "readable-test".to_string());
        Client::new(ClientConfig {
            base_url: self.base_url.clone(),
            headers,
            timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        })
        .expect("client")
    }

    fn last(&self) -> Recorded {
        self.requests.lock().last().cloned().expect("a request was made")
    }
}

fn route(method: &str, url: &str, body: &str) -> (u16, String) {
    match (method, url) {
        ("GET", "/categories") => (
            200,
            r#"{"categories":[{"name":"react","path":"react"},{"name":"redux","path":"redux"}]}"#
                .to_string(),
        ),
        ("GET", "/posts") | ("GET", "/react/posts") => (200, format!("[{POST_JSON}]")),
        ("GET", "/posts/8xf0y6ziyjabvozdd253nd/comments") => (200, format!("[{COMMENT_JSON}]")),
        ("POST", "/posts") => {
            let sent: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
            if sent["title"] == "refuse me" {
                (200, "{}".to_string())
            } else {
                let mut created = sent;
                created["voteScore"] = 1.into();
                created["commentCount"] = 0.into();
                (200, created.to_string())
            }
        }
        ("POST", "/posts/8xf0y6ziyjabvozdd253nd") => {
            let mut post: serde_json::Value = serde_json::from_str(POST_JSON).unwrap_or_default();
            post["voteScore"] = 7.into();
            (200, post.to_string())
        }
        ("PUT", "/posts/8xf0y6ziyjabvozdd253nd") => (200, POST_JSON.to_string()),
        ("DELETE", "/posts/8xf0y6ziyjabvozdd253nd") => (200, POST_JSON.to_string()),
        ("POST", "/comments") => {
            let mut created: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
            created["voteScore"] = 1.into();
            (200, created.to_string())
        }
        ("PUT", "/comments/894tuq4ut84ut8v4t8wun89g")
        | ("POST", "/comments/894tuq4ut84ut8v4t8wun89g")
        | ("DELETE", "/comments/894tuq4ut84ut8v4t8wun89g") => (200, COMMENT_JSON.to_string()),
        ("GET", "/broken/posts") => (200, "<html>oops</html>".to_string()),
        _ => (404, r#"{"error":"There was an error."}"#.to_string()),
    }
}

#[test]
fn lists_categories_with_configured_headers() {
    let board = FakeBoard::start();
    let categories = board.client().categories().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[1].path, "redux");

    let request = board.last();
    assert_eq!(request.method, "GET");
    assert_eq!(request.url, "/categories");
    assert_eq!(request.header("Authorization"), Some("readable-test"));
    assert!(request
        .header("User-Agent")
        .is_some_and(|agent| agent.starts_with("readable-tui/")));
}

#[test]
fn lists_posts_and_comments() {
    let board = FakeBoard::start();
    let client = board.client();
    let posts = client.posts().unwrap();
    assert_eq!(posts[0].vote_score, 6);
    assert_eq!(posts[0].comment_count, 2);

    let react = client.category_posts("react").unwrap();
    assert_eq!(react.len(), 1);
    assert_eq!(board.last().url, "/react/posts");

    let comments = client.post_comments("8xf0y6ziyjabvozdd253nd").unwrap();
    assert_eq!(comments[0].parent_id, "8xf0y6ziyjabvozdd253nd");
}

#[test]
fn create_post_sends_payload() {
    let board = FakeBoard::start();
    let draft = NewPost::new("Hooks", "Are neat", "thingone", "react");
    let created = board.client().create_post(&draft).unwrap();
    assert_eq!(created.id, draft.id);
    assert_eq!(created.vote_score, 1);

    let sent = board.last().json();
    assert_eq!(sent["id"], draft.id.as_str());
    assert_eq!(sent["category"], "react");
    assert_eq!(sent["author"], "thingone");
}

#[test]
fn create_without_id_is_rejected() {
    let board = FakeBoard::start();
    let draft = NewPost::new("refuse me", "body", "thingone", "react");
    let err = board.client().create_post(&draft).unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)), "got {err:?}");
}

#[test]
fn votes_send_option() {
    let board = FakeBoard::start();
    let client = board.client();
    let post = client
        .vote_post("8xf0y6ziyjabvozdd253nd", VoteDirection::Up)
        .unwrap();
    assert_eq!(post.vote_score, 7);
    assert_eq!(board.last().json()["option"], "upVote");

    client
        .vote_comment("894tuq4ut84ut8v4t8wun89g", VoteDirection::Down)
        .unwrap();
    let request = board.last();
    assert_eq!(request.url, "/comments/894tuq4ut84ut8v4t8wun89g");
    assert_eq!(request.json()["option"], "downVote");
}

#[test]
fn edits_and_deletes_use_rest_verbs() {
    let board = FakeBoard::start();
    let client = board.client();

    client
        .update_post(
            "8xf0y6ziyjabvozdd253nd",
            &PostEdit {
                title: "New title".into(),
                body: "New body".into(),
            },
        )
        .unwrap();
    let request = board.last();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.json()["title"], "New title");

    client
        .update_comment("894tuq4ut84ut8v4t8wun89g", &CommentEdit::new("edited"))
        .unwrap();
    let request = board.last();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.json()["body"], "edited");
    assert!(request.json()["timestamp"].is_i64());

    client.delete_post("8xf0y6ziyjabvozdd253nd").unwrap();
    assert_eq!(board.last().method, "DELETE");
    client.delete_comment("894tuq4ut84ut8v4t8wun89g").unwrap();
    assert_eq!(board.last().url, "/comments/894tuq4ut84ut8v4t8wun89g");

    let comment = client
        .create_comment(&NewComment::new("8xf0y6ziyjabvozdd253nd", "hi", "me"))
        .unwrap();
    assert_eq!(comment.body, "hi");
    assert_eq!(board.last().json()["parentId"], "8xf0y6ziyjabvozdd253nd");
}

#[test]
fn error_status_and_bad_bodies_are_typed() {
    let board = FakeBoard::start();
    let client = board.client();

    match client.category_posts("cooking").unwrap_err() {
        GatewayError::Status { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("There was an error."));
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let err = client.category_posts("broken").unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)), "got {err:?}");
}

#[test]
fn slow_server_times_out() {
    fn slow(_: &str, _: &str, _: &str) -> (u16, String) {
        thread::sleep(Duration::from_millis(800));
        (200, r#"{"categories":[]}"#.to_string())
    }
    let board = FakeBoard::start_with(slow);
    let client = Client::new(ClientConfig {
        base_url: board.base_url.clone(),
        timeout: Duration::from_millis(100),
        ..ClientConfig::default()
    })
    .unwrap();
    let err = client.categories().unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
}

#[test]
fn http_services_feed_the_store() {
    let board = FakeBoard::start();
    let services = Services::http(Arc::new(board.client()));
    let mut sync = Synchronizer::new(services);
    let mut store = Store::default();

    sync.refresh_categories();
    sync.refresh_posts();
    sync.fetch_comments("8xf0y6ziyjabvozdd253nd");
    assert_eq!(sync.settle(&mut store, Duration::from_secs(5)), 0);

    let state = store.snapshot();
    assert_eq!(state.categories.len(), 2);
    assert_eq!(state.posts.len(), 1);
    assert_eq!(state.comments.len(), 1);
    assert!(state.notice.is_none());

    sync.create_post(NewPost::new("refuse me", "body", "me", "react"));
    sync.settle(&mut store, Duration::from_secs(5));
    let state = store.snapshot();
    assert_eq!(state.posts.len(), 1);
    assert!(state
        .notice
        .as_ref()
        .is_some_and(|notice| notice.text().starts_with("Could not publish post")));
}
