//! `/analyze` 响应模板
//!
//! 统一的 JSON 响应格式和构建。错误同样以 200 返回，只有路由层面的
//! 404/405 使用对应状态码。

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::models::MergedRecord;

pub type ResponseBody = Full<Bytes>;

/// `/analyze` 响应体
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Data {
        data: Vec<MergedRecord>,
        message: String,
    },
    Error {
        error: String,
        trace: String,
    },
}

impl AnalyzeResponse {
    /// 两张报表任一为空
    pub fn no_data() -> Self {
        AnalyzeResponse::Data {
            data: Vec::new(),
            message: "No data found".to_string(),
        }
    }

    pub fn high_cost(records: Vec<MergedRecord>) -> Self {
        let message = format!("{} high-cost ads found", records.len());
        AnalyzeResponse::Data {
            data: records,
            message,
        }
    }

    pub fn error(error: impl Into<String>, trace: impl Into<String>) -> Self {
        AnalyzeResponse::Error {
            error: error.into(),
            trace: trace.into(),
        }
    }
}

/// 以 JSON 构建响应
pub fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response<ResponseBody> {
    let body = match serde_json::to_vec(payload) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "响应序列化失败");
            serde_json::json!({ "error": "SERIALIZATION_FAILED", "trace": e.to_string() })
                .to_string()
                .into_bytes()
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// 未知路径
pub fn not_found(path: &str) -> Response<ResponseBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "NOT_FOUND",
            "message": format!("no route for {path}"),
        }),
    )
}

/// `/analyze` 只接受 GET
pub fn method_not_allowed(method: &hyper::Method) -> Response<ResponseBody> {
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({
            "error": "METHOD_NOT_ALLOWED",
            "message": format!("{method} is not supported, use GET"),
        }),
    );
    response
        .headers_mut()
        .insert(hyper::header::ALLOW, HeaderValue::from_static("GET"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn body_json(response: Response<ResponseBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_no_data_shape() {
        let response = json_response(StatusCode::OK, &AnalyzeResponse::no_data());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"data": [], "message": "No data found"})
        );
    }

    #[tokio::test]
    async fn test_high_cost_message_counts_records() {
        let response = json_response(StatusCode::OK, &AnalyzeResponse::high_cost(Vec::new()));
        assert_eq!(
            body_json(response).await,
            json!({"data": [], "message": "0 high-cost ads found"})
        );
    }

    #[tokio::test]
    async fn test_error_shape() {
        let payload = AnalyzeResponse::error("boom", "trace text");
        let response = json_response(StatusCode::OK, &payload);
        assert_eq!(
            body_json(response).await,
            json!({"error": "boom", "trace": "trace text"})
        );
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let response = not_found("/nope");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "NOT_FOUND");

        let response = method_not_allowed(&hyper::Method::POST);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(hyper::header::ALLOW).unwrap(), "GET");
    }
}
