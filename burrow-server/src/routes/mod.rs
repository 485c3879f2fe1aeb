use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    Body,
    Response,
};
use serde_json::{json, Value};

use burrow_common::{EngineError, MessageDetail, Status, DEFAULT_CONTENT_TYPE};
use burrow_engine::{EntityProjection, MessageProjection};

pub mod accounts;
pub mod messages;
pub mod queues;

/// Shape of a rendered response, per spec.md's response table: empty body,
/// raw bytes (a scalar `id`/`body` detail), or a pretty-printed JSON
/// document.
#[derive(Debug)]
pub(crate) enum BurrowResponse {
    Empty(Status),
    Scalar(Status, Vec<u8>),
    Json(Status, String),
}

impl BurrowResponse {
    pub(crate) const fn empty(status: Status) -> Self {
        Self::Empty(status)
    }

    pub(crate) fn scalar(status: Status, body: Vec<u8>) -> Self {
        Self::Scalar(status, body)
    }

    pub(crate) fn json_pretty(status: Status, value: &Value) -> Self {
        match serde_json::to_string_pretty(value) {
            Err(err) => {
                error!("Failed to serialize json response: {}", err);
                Self::Empty(Status::InternalServerError)
            },
            Ok(json) => Self::Json(status, json),
        }
    }

    pub(crate) fn error(status: Status, message: &str) -> Self {
        Self::json_pretty(status, &json!({ "error": message }))
    }

    pub(crate) fn from_engine_error(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(message) => Self::error(Status::NotFound, &message),
            EngineError::InvalidArguments(message) => Self::error(Status::BadRequest, &message),
        }
    }

    pub(crate) fn into_response(self) -> Response<Body> {
        match self {
            Self::Empty(status) => {
                let mut res = Response::new(Body::default());
                *res.status_mut() = status.into();
                res
            },
            Self::Scalar(status, body) => {
                let mut res = Response::new(Body::from(body));
                *res.status_mut() = status.into();
                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
                res
            },
            Self::Json(status, body) => {
                let mut res = Response::new(Body::from(body));
                *res.status_mut() = status.into();
                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res
            },
        }
    }
}

/// `body` is embedded as UTF-8 text, not base64 — matches spec.md's worked
/// examples (`"body":"test"`) exactly. Non-UTF-8 payloads round-trip exactly
/// through `detail=body`/octet-stream instead, which never goes through
/// this function.
fn message_value(p: &MessageProjection) -> Value {
    match p {
        MessageProjection::Id(id) => Value::String(id.clone()),
        MessageProjection::Body(body) => Value::String(String::from_utf8_lossy(body).into_owned()),
        MessageProjection::Attributes { id, ttl, hide } => json!({ "id": id, "ttl": ttl, "hide": hide }),
        MessageProjection::All { id, ttl, hide, body } => json!({
            "id": id,
            "ttl": ttl,
            "hide": hide,
            "body": String::from_utf8_lossy(body),
        }),
    }
}

fn entity_value(p: &EntityProjection) -> Value {
    match p {
        EntityProjection::Id(id) => Value::String(id.clone()),
        EntityProjection::All(id) => json!({ "id": id }),
    }
}

/// Render a single message result. `detail == None` always renders empty
/// regardless of the projection the engine happened to fall back to, since
/// the engine has no `Option<MessageProjection>` to return through its
/// trait signature.
pub(crate) fn single_message_response(status: Status, detail: MessageDetail, projection: MessageProjection) -> BurrowResponse {
    if detail == MessageDetail::None {
        return BurrowResponse::empty(Status::NoContent);
    }
    match projection {
        MessageProjection::Id(id) => BurrowResponse::scalar(status, id.into_bytes()),
        MessageProjection::Body(body) => BurrowResponse::scalar(status, body),
        other => BurrowResponse::json_pretty(status, &message_value(&other)),
    }
}

/// Render a message range result. The messages-collection endpoint always
/// yields a list shape, even for a single matching message (spec.md's S1:
/// `GET /v1.0/a/q` yields a one-element JSON array, not a bare scalar).
pub(crate) fn message_list_response(items: &[MessageProjection]) -> BurrowResponse {
    if items.is_empty() {
        return BurrowResponse::empty(Status::NoContent);
    }
    let values: Vec<Value> = items.iter().map(message_value).collect();
    BurrowResponse::json_pretty(Status::Ok, &Value::Array(values))
}

/// Render an account/queue range result (list or bulk-delete).
pub(crate) fn entity_list_response(items: &[EntityProjection]) -> BurrowResponse {
    if items.is_empty() {
        return BurrowResponse::empty(Status::NoContent);
    }
    let values: Vec<Value> = items.iter().map(entity_value).collect();
    BurrowResponse::json_pretty(Status::Ok, &Value::Array(values))
}

#[cfg(test)]
mod test {
    use super::*;
    use burrow_common::test::read_body;

    #[test]
    fn empty_response_has_no_body() {
        let mut response = BurrowResponse::empty(Status::NoContent).into_response();
        assert_eq!(response.status().as_u16(), 204);
        assert!(response.headers().is_empty());
        assert_eq!(read_body(response.body_mut()), Vec::<u8>::new());
    }

    #[test]
    fn scalar_response_is_octet_stream() {
        let mut response = BurrowResponse::scalar(Status::Ok, b"hello".to_vec()).into_response();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
        );
        assert_eq!(read_body(response.body_mut()), b"hello".to_vec());
    }

    #[test]
    fn json_error_response() {
        let mut response = BurrowResponse::from_engine_error(EngineError::not_found("no such queue")).into_response();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            HeaderValue::from_static("application/json")
        );
        assert_eq!(read_body(response.body_mut()), b"{\n  \"error\": \"no such queue\"\n}".to_vec());
    }

    #[test]
    fn single_message_detail_none_is_empty() {
        let response = single_message_response(Status::Ok, MessageDetail::None, MessageProjection::Id("m1".to_string()));
        assert!(matches!(response, BurrowResponse::Empty(Status::NoContent)));
    }

    #[test]
    fn single_message_body_is_scalar() {
        let response = single_message_response(Status::Ok, MessageDetail::Body, MessageProjection::Body(b"hi".to_vec()));
        assert!(matches!(response, BurrowResponse::Scalar(Status::Ok, body) if body == b"hi".to_vec()));
    }

    #[test]
    fn empty_list_is_empty_response() {
        let response = message_list_response(&[]);
        assert!(matches!(response, BurrowResponse::Empty(Status::NoContent)));
        let response = entity_list_response(&[]);
        assert!(matches!(response, BurrowResponse::Empty(Status::NoContent)));
    }
}
