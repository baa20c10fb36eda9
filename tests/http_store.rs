// HttpUserStore against a one-shot HTTP responder on localhost

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use usrapi_manager::StoreError;
use usrapi_manager::api::{Draft, Field, HttpUserStore, StoreConfig, UserRecord, UserStore};

/// Accept one connection, answer with `status` and `body`, and hand back
/// the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let body_len = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn store(base_url: &str) -> HttpUserStore {
    HttpUserStore::new(&StoreConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn body_json(request: &str) -> Value {
    let (_, body) = request.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn list_parses_records_and_keeps_unknown_fields() {
    let (url, server) = serve_once(
        "200 OK",
        r#"[{"id":1,"name":"Leanne Graham","username":"Bret","email":"Sincere@april.biz",
            "address":{"street":"Kulas Light","city":"Gwenborough"},"phone":"1-770-736-8031"},
           {"id":2,"name":"Ervin Howell","username":"Antonette","email":null}]"#,
    )
    .await;

    let users = store(&url).list().await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("GET /users HTTP/1.1"));
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].city(), "Gwenborough");
    assert_eq!(users[0].extra.get("phone").and_then(Value::as_str), Some("1-770-736-8031"));
    assert_eq!(users[0].address.extra.get("street").and_then(Value::as_str), Some("Kulas Light"));
    assert_eq!(users[1].email, "");
    assert_eq!(users[1].city(), "");
}

#[tokio::test]
async fn create_posts_nested_city_as_json() {
    let (url, server) = serve_once(
        "201 Created",
        r#"{"id":11,"name":"A","username":"a","email":"a@x.com","address":{"city":"NY"}}"#,
    )
    .await;
    let draft = Draft::default()
        .with_field(Field::Name, "A")
        .with_field(Field::Username, "a")
        .with_field(Field::Email, "a@x.com")
        .with_field(Field::City, "NY");

    let created = store(&url).create(&draft).await.unwrap();
    let request = server.await.unwrap();

    assert_eq!(created.id, 11);
    assert!(request.starts_with("POST /users HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
    let body = body_json(&request);
    assert_eq!(body["name"], "A");
    assert_eq!(body["address"]["city"], "NY");
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn update_patches_full_record() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"id":3,"name":"C","username":"c","email":"c@x","address":{"city":"Z"},"phone":"9"}"#,
    )
    .await;
    let mut record = UserRecord::new(3, "C", "c", "c@x", "Z");
    record.extra.insert("phone".into(), Value::from("9"));

    let updated = store(&url).update(3, &record).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("PATCH /users/3 HTTP/1.1"));
    assert_eq!(body_json(&request)["phone"], "9");
    assert_eq!(updated, record);
}

#[tokio::test]
async fn update_of_missing_user_is_not_found() {
    let (url, server) = serve_once("404 Not Found", "{}").await;
    let err = store(&url)
        .update(77, &UserRecord::new(77, "x", "x", "x", "x"))
        .await
        .unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, StoreError::NotFound(77)));
}

#[tokio::test]
async fn list_error_status_is_transport_family() {
    let (url, server) = serve_once("503 Service Unavailable", "{}").await;
    let err = store(&url).list().await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, StoreError::Status { status: 503 }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn delete_reports_status_without_error() {
    let (url, server) = serve_once("500 Internal Server Error", "").await;
    let status = store(&url).delete(1).await.unwrap();
    let request = server.await.unwrap();
    assert!(request.starts_with("DELETE /users/1 HTTP/1.1"));
    assert_eq!(status, 500);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = store(&url).list().await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(socket);
    });

    let slow = HttpUserStore::new(&StoreConfig {
        base_url: url,
        timeout: Duration::from_millis(200),
    })
    .unwrap();
    match slow.list().await {
        Err(StoreError::Transport(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
    server.abort();
}
