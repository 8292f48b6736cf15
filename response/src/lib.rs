use lambda_http::{
    http::header::{ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE},
    Body, Response,
};
use serde::Serialize;
use serde_json::json;

fn json_response(status: u16, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true")
        .body(Body::Text(body))
        .expect("failed to render response")
}

fn message(text: &str) -> String {
    json!({ "message": text }).to_string()
}

pub fn ok<T>(body: T) -> Response<Body>
where
    T: Serialize,
{
    json_response(200, json!(body).to_string())
}

pub fn bad_request(text: &str) -> Response<Body> {
    json_response(400, message(text))
}

pub fn not_found(text: &str) -> Response<Body> {
    json_response(404, message(text))
}

pub fn server_error(text: &str) -> Response<Body> {
    json_response(500, message(text))
}
