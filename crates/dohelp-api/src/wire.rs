// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response shapes for the marketplace REST API.

use serde::{Deserialize, Serialize};

use dohelp_core::types::{ConversationId, TaskId, UserId};

/// Body of `POST /conversation`.
#[derive(Debug, Serialize)]
pub struct CreateConversationRequest<'a> {
    pub receiver_id: &'a UserId,
    pub task_id: &'a TaskId,
}

/// Response of `POST /conversation`.
#[derive(Debug, Deserialize)]
pub struct ConversationResponse {
    pub id: ConversationId,
}

/// Body of `POST /message`.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub conversation_id: &'a ConversationId,
    pub body: &'a str,
}

/// Error payload returned by the marketplace API on non-2xx responses.
///
/// Not guaranteed: auth proxies and gateways in front of the API return
/// HTML error pages, so the client always falls back to the raw body when
/// this shape does not parse.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Inner error detail of [`ApiErrorResponse`].
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_conversation_request_serializes() {
        let receiver = UserId("U2".into());
        let task = TaskId("T1".into());
        let req = CreateConversationRequest {
            receiver_id: &receiver,
            task_id: &task,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["receiver_id"], "U2");
        assert_eq!(json["task_id"], "T1");
    }

    #[test]
    fn conversation_response_accepts_numeric_id() {
        let resp: ConversationResponse = serde_json::from_str(r#"{"id": 17}"#).unwrap();
        assert_eq!(resp.id, ConversationId("17".into()));
    }

    #[test]
    fn api_error_response_parses() {
        let resp: ApiErrorResponse =
            serde_json::from_str(r#"{"error": {"code": "not_found", "message": "no such task"}}"#)
                .unwrap();
        assert_eq!(resp.error.code, "not_found");
    }
}
