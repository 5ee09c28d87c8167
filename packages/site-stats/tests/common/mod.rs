//! In-process HTTP server standing in for websites and the lookup service.

#![allow(dead_code)]

use axum::extract::RawQuery;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::time::Duration;

/// Title of the windows-1251 page, as it should come out.
pub const CP1251_TITLE: &str = "Привет, мир";

/// Google value served by the stats page.
pub const GOOGLE_VALUE: &str = "2 222";

pub struct TestServer {
    pub base: String,
}

impl TestServer {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/", get(|| async { page("Home Page") }))
            .route("/landing", get(|| async { page("Landing") }))
            .route(
                "/moved",
                get(|| async { (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/landing")]) }),
            )
            .route(
                "/found",
                get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/found")]) }),
            )
            .route("/cp1251", get(cp1251_page))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    page("Too late")
                }),
            )
            .route("/stats", get(stats_page));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Host and port without a scheme.
    pub fn host(&self) -> &str {
        self.base.trim_start_matches("http://")
    }

    pub fn lookup_endpoint(&self) -> String {
        self.url("/stats?sword=")
    }
}

/// A local address nothing is listening on.
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

fn page(title: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>{}</title></head><body></body></html>",
        title
    ))
}

async fn cp1251_page() -> Response {
    let mut body = b"<html><head><title>".to_vec();
    body.extend_from_slice(&site_stats::encoding::encode_legacy(CP1251_TITLE));
    body.extend_from_slice(b"</title></head></html>");
    (
        [(header::CONTENT_TYPE, "text/html; charset=windows-1251")],
        body,
    )
        .into_response()
}

/// Echoes the raw `sword` value in the Yandex cell so tests can see what
/// was queried. Targets containing `notable` get a page without the table.
async fn stats_page(RawQuery(query): RawQuery) -> Html<String> {
    let query = query.unwrap_or_default();
    let sword = query.strip_prefix("sword=").unwrap_or(&query).to_string();

    if sword.contains("notable") {
        return Html("<html><body><p>Nothing found</p></body></html>".to_string());
    }

    let mut cells = vec!["-".to_string(); 12];
    cells[1] = sword;
    cells[10] = GOOGLE_VALUE.to_string();
    let cells: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
    Html(format!(
        r#"<html><body><table class="data_table stat"><tr class="white">{}</tr></table></body></html>"#,
        cells
    ))
}
