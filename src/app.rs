use std::time::Duration;

use axum::{
    http::{Request, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, warn, Span};

use crate::state::AppState;
use crate::{bikes, rentals, users};

/// Every resource router plus `/` and `/health`, with CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .merge(users::router())
        .merge(bikes::router())
        .merge(rentals::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        status = tracing::field::Empty,
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", status.as_u16());
                    let elapsed_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        error!(%status, elapsed_ms, "request failed");
                    } else if status.is_client_error() {
                        warn!(%status, elapsed_ms, "request rejected");
                    } else {
                        info!(%status, elapsed_ms, "request served");
                    }
                }),
        )
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the PedalPro API!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serves until Ctrl+C (or SIGTERM on unix), letting in-flight requests finish.
pub async fn serve(app: Router, bind_addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "pedalpro listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("pedalpro stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received; shutting down"),
        _ = terminate => info!("SIGTERM received; shutting down"),
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::notify::testing::RecordingNotifier;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn rental_flow_end_to_end() {
        let notifier = Arc::new(RecordingNotifier::default());
        let app = build_app(AppState::fake_with_notifier(notifier.clone()));

        let (status, user) = call(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"nome": "Ana", "telefone": "11999990000", "senha": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["nome"], "Ana");
        assert!(user.get("senha").is_none());

        let (status, bike) = call(
            &app,
            Method::POST,
            "/bikes/",
            Some(json!({"tamanho": "medio", "modelo": "Caloi10"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bike["tamanho"], "medium");
        assert_eq!(bike["disponivel"], true);

        let rental_body = json!({
            "user_id": user["id"],
            "bike_id": bike["id"],
            "data_retirada": "2025-01-01T10:00",
            "preco": 25.0
        });
        let (status, rental) = call(&app, Method::POST, "/locacoes/", Some(rental_body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental["user_nome"], "Ana");
        assert_eq!(rental["user_telefone"], "11999990000");
        assert_eq!(rental["bike_tamanho"], "medium");
        assert_eq!(rental["bike_modelo"], "Caloi10");
        assert_eq!(rental["data_retirada"], "2025-01-01T10:00:00");
        assert_eq!(rental["preco"], 25.0);
        assert_eq!(notifier.wait_for(1).await.len(), 1);

        let again = json!({
            "user_id": user["id"],
            "bike_id": bike["id"],
            "data_retirada": "2025-01-05T10:00",
            "preco": 25.0
        });
        let (status, err) = call(&app, Method::POST, "/locacoes/", Some(again)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["detail"], "rental already exists");

        let uri = format!("/locacoes/{}", rental["id"]);
        let (status, read) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read, rental);

        let (status, list) = call(&app, Method::GET, "/locacoes/?ini=0&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["locacoes"].as_array().unwrap().len(), 1);
        assert!(list["locacoes"][0].get("user_nome").is_none());

        let (status, msg) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(msg["message"], "Locacao deleted");
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn same_slot_maps_to_409() {
        let app = build_app(AppState::fake());
        for phone in ["11999990000", "11999990001"] {
            call(
                &app,
                Method::POST,
                "/users/",
                Some(json!({"nome": "Ana", "telefone": phone, "senha": "x"})),
            )
            .await;
        }
        call(&app, Method::POST, "/bikes/", Some(json!({"tamanho": "small", "modelo": "Sense"}))).await;

        let body = |user_id: i64| {
            json!({"user_id": user_id, "bike_id": 1, "data_retirada": "2025-01-01T10:00:00", "preco": 10})
        };
        let (status, _) = call(&app, Method::POST, "/locacoes/", Some(body(1))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, err) = call(&app, Method::POST, "/locacoes/", Some(body(2))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["detail"], "date taken");
    }

    #[tokio::test]
    async fn boundary_validation_returns_400() {
        let app = build_app(AppState::fake());

        let (status, err) = call(
            &app,
            Method::POST,
            "/bikes/",
            Some(json!({"tamanho": "gigante", "modelo": "Caloi10"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["detail"].is_string());

        let (status, _) = call(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"nome": "Ana", "telefone": "abc", "senha": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            "/locacoes/",
            Some(json!({"user_id": 1, "bike_id": 1, "data_retirada": "2025-01-01T10:00", "preco": -1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/users/?ini=-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_path_and_query_use_detail_body() {
        let app = build_app(AppState::fake());
        for (method, uri) in [
            (Method::GET, "/users/abc"),
            (Method::DELETE, "/bikes/abc"),
            (Method::GET, "/locacoes/1.5"),
            (Method::GET, "/locacoes/?limit=abc"),
            (Method::GET, "/bikes/?ini=x"),
        ] {
            let (status, err) = call(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(err["detail"].is_string(), "{uri}: {err}");
        }
    }

    #[tokio::test]
    async fn missing_records_map_to_404() {
        let app = build_app(AppState::fake());
        for uri in ["/users/9", "/bikes/9", "/locacoes/9"] {
            let (status, err) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(err["detail"].as_str().unwrap().ends_with("not found"));
        }
        let (status, err) = call(
            &app,
            Method::POST,
            "/locacoes/",
            Some(json!({"user_id": 9, "bike_id": 9, "data_retirada": "2025-01-01T10:00", "preco": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["detail"], "user not found");
    }

    #[tokio::test]
    async fn root_and_health() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to the PedalPro API!");

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
