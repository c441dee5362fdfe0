use serde::{Deserialize, Serialize};

use super::request::{Notification, Request, RpcId};
use super::response::{ErrorResponse, Response, RpcError};

/// Any message that can appear on the wire, classified structurally:
/// `method` with an `id` is a request, `method` without one a notification,
/// `result` a response, `error` an error response. Classification happens
/// at decode time, so handlers never see an ambiguous envelope.
///
/// Variants are tried in declaration order, so a message carrying both an
/// `id` and a `method` is a request, and one carrying `method` alone falls
/// through to notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
    Error(ErrorResponse),
}

impl Message {
    pub fn request(id: RpcId, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self::Request(Request {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        })
    }

    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self::Notification(Notification {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
        })
    }

    pub fn success(id: RpcId, result: serde_json::Value) -> Self {
        Self::Response(Response {
            jsonrpc: "2.0".into(),
            id,
            result,
        })
    }

    pub fn error(id: Option<RpcId>, error: RpcError) -> Self {
        Self::Error(ErrorResponse {
            jsonrpc: "2.0".into(),
            id,
            error,
        })
    }

    /// The correlation id, when one is present.
    pub fn id(&self) -> Option<&RpcId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Notification(_) => None,
            Self::Response(r) => Some(&r.id),
            Self::Error(e) => e.id.as_ref(),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            _ => None,
        }
    }
}
