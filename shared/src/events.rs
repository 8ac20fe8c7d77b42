use serde::{Deserialize, Serialize};

/// Sender name of the authoritative game master on the push channel.
pub const GAME_MASTER: &str = "GM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Join,
    Leave,
    Chat,
}

/// One entry of the append-only push-channel log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    YourTurn,
    NotYourTurn,
}

/// Classify the tail of the log: the newest message naming `player` means
/// their turn has arrived; anything else means it has not.
pub fn turn_signal(log: &[ChannelMessage], player: &str) -> Option<TurnSignal> {
    let last = log.last()?;
    if last.content == player {
        Some(TurnSignal::YourTurn)
    } else {
        Some(TurnSignal::NotYourTurn)
    }
}

/// Most recent message from `sender`, scanning from the tail.
pub fn latest_from<'a>(log: &'a [ChannelMessage], sender: &str) -> Option<&'a ChannelMessage> {
    log.iter().rev().find(|message| message.sender == sender)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, kind: MessageKind, content: &str) -> ChannelMessage {
        ChannelMessage {
            sender: sender.into(),
            kind,
            content: content.into(),
            timestamp: None,
        }
    }

    #[test]
    fn decodes_uppercase_message_type() {
        let raw = r#"{"sender":"GM","type":"CHAT","content":"alice","timestamp":"12:00"}"#;
        let decoded: ChannelMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.kind, MessageKind::Chat);
        assert_eq!(decoded.content, "alice");
        assert_eq!(decoded.timestamp.as_deref(), Some("12:00"));

        let join: ChannelMessage = serde_json::from_str(r#"{"sender":"bob","type":"JOIN"}"#).unwrap();
        assert_eq!(join.kind, MessageKind::Join);
        assert!(join.content.is_empty());
    }

    #[test]
    fn only_the_tail_decides_the_turn() {
        let mut log = vec![message("GM", MessageKind::Chat, "alice")];
        assert_eq!(turn_signal(&log, "alice"), Some(TurnSignal::YourTurn));

        log.push(message("bob", MessageKind::Join, ""));
        assert_eq!(turn_signal(&log, "alice"), Some(TurnSignal::NotYourTurn));
        assert_eq!(turn_signal(&[], "alice"), None);
    }

    #[test]
    fn latest_from_scans_backwards() {
        let log = vec![
            message("GM", MessageKind::Chat, "Turn 1 begins"),
            message("bob", MessageKind::Chat, "hi"),
            message("GM", MessageKind::Chat, "Turn 2 begins"),
            message("carol", MessageKind::Leave, ""),
        ];
        let latest = latest_from(&log, GAME_MASTER).map(|m| m.content.as_str());
        assert_eq!(latest, Some("Turn 2 begins"));
        assert!(latest_from(&log, "dave").is_none());
    }
}
