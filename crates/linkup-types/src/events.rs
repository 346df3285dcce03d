use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events pushed to clients over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    #[serde(rename = "ready", rename_all = "camelCase")]
    Ready { user_id: i64 },

    /// A direct message was stored for the addressee
    #[serde(rename = "message:new")]
    MessageNew {
        from: i64,
        to: i64,
        message: Message,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn message_new_uses_colon_tag() {
        let event = GatewayEvent::MessageNew {
            from: 5,
            to: 9,
            message: Message {
                message_id: 12,
                sender_id: 5,
                receiver_id: 9,
                content: "halo".into(),
                file_url: None,
                message_type: "text".into(),
                is_read: false,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message:new");
        assert_eq!(json["data"]["from"], 5);
        assert_eq!(json["data"]["message"]["messageId"], 12);
    }

    #[test]
    fn identify_parses() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        let GatewayCommand::Identify { token } = cmd;
        assert_eq!(token, "abc");
    }
}
