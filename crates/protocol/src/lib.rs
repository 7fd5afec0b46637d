//! Wire protocol for the intrachat gateway.
//!
//! Every frame in either direction is a UTF-8 JSON text message of shape
//! `{ "type": string, "data": object }`. Inbound frames parse into
//! [`ClientRequest`]; outbound frames serialize from [`ServerEvent`].
//! Frames whose `type` is not a known request are passed through verbatim
//! to all connected channels (legacy chat compatibility), so parsing
//! distinguishes "unknown type" from "known type, bad payload".

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── Wire summaries ───────────────────────────────────────────────────────────

/// Account fields returned on login (secret excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub cpf: String,
    pub nome: String,
    pub setor: String,
    pub cargo: String,
}

/// One entry of the `usersList` event, annotated with live presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub cpf: String,
    pub nome: String,
    pub setor: String,
    pub cargo: String,
    pub online: bool,
}

/// The counterpart shown in `conversationStarted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSummary {
    pub cpf: String,
    pub nome: String,
    pub setor: String,
}

/// Minimal `{cpf, nome}` reference used for message senders and group
/// participant lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub cpf: String,
    pub nome: String,
}

/// A chat message as stored and as sent on the wire. Immutable once
/// appended; `id` and `timestamp` are server-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: ParticipantRef,
    pub content: String,
    pub timestamp: String,
}

/// Group shape carried by the `groupCreated` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub participants: Vec<ParticipantRef>,
}

// ── Inbound requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoginParams {
    pub cpf: String,
    pub senha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterParams {
    pub cpf: String,
    pub senha: String,
    pub nome: String,
    pub setor: String,
    pub cargo: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationParams {
    pub target_cpf: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub is_group: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupParams {
    pub group_name: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupParams {
    pub group_id: String,
}

/// A parsed client request.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    Login(LoginParams),
    Register(RegisterParams),
    GetUsers,
    StartConversation(StartConversationParams),
    SendMessage(SendMessageParams),
    CreateGroup(CreateGroupParams),
    JoinGroup(JoinGroupParams),
}

impl ClientRequest {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::Login(_) => "login",
            ClientRequest::Register(_) => "register",
            ClientRequest::GetUsers => "getUsers",
            ClientRequest::StartConversation(_) => "startConversation",
            ClientRequest::SendMessage(_) => "sendMessage",
            ClientRequest::CreateGroup(_) => "createGroup",
            ClientRequest::JoinGroup(_) => "joinGroup",
        }
    }
}

/// Outcome of parsing one inbound text frame.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A recognized request.
    Request(ClientRequest),
    /// Valid JSON with an unrecognized `type`: relayed verbatim to every
    /// connected channel (legacy chat compatibility path).
    Legacy,
}

/// Why an inbound frame could not be parsed. Malformed frames are logged
/// server-side and otherwise swallowed; the channel stays open.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("invalid `{kind}` payload: {source}")]
    BadPayload {
        kind: String,
        source: serde_json::Error,
    },
}

/// Parse one inbound text frame into a request or the legacy passthrough.
pub fn parse_frame(text: &str) -> Result<Inbound, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(FrameError::MissingType);
    };
    // Absent `data` is treated as `{}`; requests without parameters
    // (getUsers) accept either.
    let data = value
        .get("data")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    let bad = |source| FrameError::BadPayload {
        kind: kind.to_string(),
        source,
    };
    let request = match kind {
        "login" => ClientRequest::Login(serde_json::from_value(data).map_err(bad)?),
        "register" => ClientRequest::Register(serde_json::from_value(data).map_err(bad)?),
        "getUsers" => ClientRequest::GetUsers,
        "startConversation" => {
            ClientRequest::StartConversation(serde_json::from_value(data).map_err(bad)?)
        },
        "sendMessage" => ClientRequest::SendMessage(serde_json::from_value(data).map_err(bad)?),
        "createGroup" => ClientRequest::CreateGroup(serde_json::from_value(data).map_err(bad)?),
        "joinGroup" => ClientRequest::JoinGroup(serde_json::from_value(data).map_err(bad)?),
        _ => return Ok(Inbound::Legacy),
    };
    Ok(Inbound::Request(request))
}

// ── Outbound events ──────────────────────────────────────────────────────────

/// A server-originated event frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    LoginSuccess {
        user: UserProfile,
    },
    LoginError {
        message: String,
    },
    RegisterSuccess {
        message: String,
    },
    RegisterError {
        message: String,
    },
    UsersList(Vec<DirectoryEntry>),
    ConversationStarted {
        conversation_id: String,
        target_user: PeerSummary,
        messages: Vec<Message>,
    },
    NewMessage {
        conversation_id: String,
        message: Message,
        is_group: bool,
    },
    GroupCreated {
        group: GroupSummary,
    },
    GroupJoined {
        group_id: String,
        group_name: String,
        messages: Vec<Message>,
        participants: Vec<ParticipantRef>,
    },
}

impl ServerEvent {
    /// Serialize to the `{type, data}` text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_login() {
        let frame = r#"{"type":"login","data":{"cpf":"123","senha":"pw"}}"#;
        match parse_frame(frame) {
            Ok(Inbound::Request(ClientRequest::Login(p))) => {
                assert_eq!(p.cpf, "123");
                assert_eq!(p.senha, "pw");
            },
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn get_users_accepts_missing_data() {
        for frame in [r#"{"type":"getUsers"}"#, r#"{"type":"getUsers","data":{}}"#] {
            assert!(matches!(
                parse_frame(frame),
                Ok(Inbound::Request(ClientRequest::GetUsers))
            ));
        }
    }

    #[test]
    fn send_message_defaults_is_group() {
        let frame = r#"{"type":"sendMessage","data":{"conversationId":"a-b","content":"oi"}}"#;
        match parse_frame(frame) {
            Ok(Inbound::Request(ClientRequest::SendMessage(p))) => {
                assert_eq!(p.conversation_id, "a-b");
                assert!(!p.is_group);
            },
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_legacy() {
        let frame = r#"{"type":"typing","data":{"who":"x"}}"#;
        assert!(matches!(parse_frame(frame), Ok(Inbound::Legacy)));
    }

    #[test]
    fn bad_payload_is_an_error_not_legacy() {
        let frame = r#"{"type":"login","data":{"cpf":123}}"#;
        assert!(matches!(
            parse_frame(frame),
            Err(FrameError::BadPayload { .. })
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(parse_frame("not json"), Err(FrameError::Json(_))));
        assert!(matches!(parse_frame(r#"{"data":{}}"#), Err(FrameError::MissingType)));
    }

    #[test]
    fn events_use_camel_case_tags_and_fields() {
        let event = ServerEvent::NewMessage {
            conversation_id: "a-b".into(),
            message: Message {
                id: "1".into(),
                sender: ParticipantRef {
                    cpf: "123".into(),
                    nome: "Ana".into(),
                },
                content: "oi".into(),
                timestamp: "2024-01-01T00:00:00.000Z".into(),
            },
            is_group: false,
        };
        let value: Value = serde_json::from_str(&event.encode().expect("encode")).expect("json");
        assert_eq!(value["type"], "newMessage");
        assert_eq!(value["data"]["conversationId"], "a-b");
        assert_eq!(value["data"]["isGroup"], false);
        assert_eq!(value["data"]["message"]["sender"]["nome"], "Ana");
    }

    #[test]
    fn users_list_data_is_an_array() {
        let event = ServerEvent::UsersList(vec![DirectoryEntry {
            cpf: "123".into(),
            nome: "Ana".into(),
            setor: "RH".into(),
            cargo: "Analista".into(),
            online: true,
        }]);
        let value: Value = serde_json::from_str(&event.encode().expect("encode")).expect("json");
        assert_eq!(value["type"], "usersList");
        assert!(value["data"].is_array());
        assert_eq!(value["data"][0]["online"], true);
    }
}
