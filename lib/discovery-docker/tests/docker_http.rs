use discovery_core::{ContainerRuntime, CoreError};
use discovery_docker::{DockerClient, DockerError};
use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::rt::tokio::TokioIo;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};

const CONTAINERS: &str = r#"[
    {"Id":"c1","Names":["/app-1"],"Ports":[{"IP":"0.0.0.0","PrivatePort":8080,"PublicPort":33000,"Type":"tcp"}]},
    {"Id":"c2","Names":["/db-1"],"Ports":[{"PrivatePort":5432,"Type":"tcp"}]}
]"#;

async fn handle(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (status, body) = match req.uri().path() {
        "/containers/json" => (StatusCode::OK, CONTAINERS),
        _ => (StatusCode::NOT_FOUND, r#"{"message":"page not found"}"#),
    };
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

fn serve<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let _ = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service_fn(handle))
            .await;
    });
}

fn socket_path() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("discovery-docker-{}-{}.sock", std::process::id(), nanos))
}

#[tokio::test]
async fn test_list_containers_over_unix_socket() {
    let path = socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream);
        }
    });

    let client = DockerClient::new(
        &format!("unix://{}", path.display()),
        Duration::from_secs(2),
    )
    .unwrap();
    let containers = client.list_containers().await.unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].names, vec!["/app-1"]);
    assert_eq!(containers[0].ports[0].public_port, Some(33000));
    assert_eq!(containers[1].ports[0].public_port, None);
}

#[tokio::test]
async fn test_list_containers_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream);
        }
    });

    let client = DockerClient::new(&format!("tcp://{}", addr), Duration::from_secs(2)).unwrap();
    let containers = client.list_containers().await.unwrap();
    assert_eq!(containers[0].id, "c1");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream);
        }
    });

    let client = DockerClient::new(&format!("tcp://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.get("/version").await.unwrap_err();
    assert!(matches!(err, DockerError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_daemon_is_a_runtime_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = DockerClient::new(&format!("tcp://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.list_containers().await.unwrap_err();
    assert!(matches!(err, CoreError::Runtime(_)));
}
