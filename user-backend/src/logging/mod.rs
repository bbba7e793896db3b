// user-backend/src/logging/mod.rs

//! リクエスト単位のログ
//!
//! 各リクエストに ID を振り、`request` スパンの中でハンドラを実行する。
//! サービス層のログ（登録拒否、ログイン失敗など）はスパンの
//! `request_id` / `method` / `path` を引き継ぐ。

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// リクエスト ID を受け取り・返すヘッダー
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 呼び出し元から受け取る ID の最大長（これを超えたら採番し直す）
const MAX_REQUEST_ID_LEN: usize = 128;

/// 呼び出し元の ID があればそれを使い、なければ UUID v4 を採番する
pub fn request_id_for(req: &Request<Body>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// リクエストスパンを張り、開始・完了をログに出すミドルウェア
///
/// 完了ログのレベルはステータスで変える（5xx: error, 4xx: warn, それ以外: info）。
/// レスポンスには同じ ID を `x-request-id` として付ける。
pub async fn request_span_middleware(req: Request<Body>, next: Next) -> Response {
    let request_id = request_id_for(&req);
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let start = Instant::now();
        info!("Request started");

        let mut response = next.run(req).await;

        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis() as u64;
        if status >= 500 {
            error!(status, duration_ms, "Request completed");
        } else if status >= 400 {
            warn!(status, duration_ms, "Request completed");
        } else {
            info!(status, duration_ms, "Request completed");
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}
