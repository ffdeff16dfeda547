//! Health and metrics endpoint

use discovery_core::DiscoveryMetrics;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::tokio::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Accept diagnostics connections until the process exits
pub async fn serve(listener: TcpListener, metrics: DiscoveryMetrics) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept diagnostics connection: {}", e);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving diagnostics connection from {}: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: DiscoveryMetrics,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    Ok(respond(req.method(), req.uri().path(), &metrics))
}

fn respond(method: &Method, path: &str, metrics: &DiscoveryMetrics) -> Response<Full<Bytes>> {
    debug!("{} {}", method, path);

    match path {
        "/healthz" => text(StatusCode::OK, "OK\n".to_string()),
        "/metrics" if method == Method::GET => match metrics.gather() {
            Ok(body) => {
                let mut resp = text(StatusCode::OK, body);
                resp.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                resp
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics\n".to_string())
            }
        },
        _ => text(StatusCode::NOT_FOUND, "Not Found\n".to_string()),
    }
}

fn text(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = status;
    resp
}
