use serde::{Deserialize, Serialize};

use crate::models::message::MessagePatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    pub read: Option<bool>,
}

impl From<UpdateMessageRequest> for MessagePatch {
    fn from(req: UpdateMessageRequest) -> Self {
        MessagePatch { read: req.read }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: usize,
    pub total: usize,
}
