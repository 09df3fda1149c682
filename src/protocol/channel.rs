/// Logical channels between the host and the display
use serde::{Deserialize, Serialize};

use crate::pty::ExitInfo;

/// host -> display: raw shell output
pub const OUTPUT_CHANNEL: &str = "terminal.output";

/// display -> host: raw keystrokes and pasted text
pub const INPUT_CHANNEL: &str = "terminal.input";

/// host -> display: the shell exited
pub const EXIT_CHANNEL: &str = "terminal.exit";

/// A message on one of the display channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Output(Vec<u8>),
    Input(Vec<u8>),
    Exit(ExitInfo),
}

impl ChannelMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            ChannelMessage::Output(_) => OUTPUT_CHANNEL,
            ChannelMessage::Input(_) => INPUT_CHANNEL,
            ChannelMessage::Exit(_) => EXIT_CHANNEL,
        }
    }
}

/// JSON envelope used for text frames. Raw byte payloads travel in binary
/// frames; text frames name their channel explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel")]
pub enum Envelope {
    #[serde(rename = "terminal.input")]
    Input { data: String },

    #[serde(rename = "terminal.output")]
    Output { data: String },

    #[serde(rename = "terminal.exit", rename_all = "camelCase")]
    Exit {
        exit_code: u32,
        signal: Option<String>,
    },
}

impl From<Envelope> for ChannelMessage {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Input { data } => ChannelMessage::Input(data.into_bytes()),
            Envelope::Output { data } => ChannelMessage::Output(data.into_bytes()),
            Envelope::Exit { exit_code, signal } => {
                ChannelMessage::Exit(ExitInfo { exit_code, signal })
            }
        }
    }
}

impl From<&ExitInfo> for Envelope {
    fn from(exit: &ExitInfo) -> Self {
        Envelope::Exit {
            exit_code: exit.exit_code,
            signal: exit.signal.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_envelope_decodes_to_raw_bytes() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"channel":"terminal.input","data":"ls -la\r"}"#).unwrap();
        assert_eq!(
            ChannelMessage::from(envelope),
            ChannelMessage::Input(b"ls -la\r".to_vec())
        );
    }

    #[test]
    fn exit_envelope_uses_camel_case() {
        let exit = ExitInfo {
            exit_code: 1,
            signal: Some("Hangup".to_string()),
        };
        let json = serde_json::to_value(Envelope::from(&exit)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"channel": "terminal.exit", "exitCode": 1, "signal": "Hangup"})
        );
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let parsed = serde_json::from_str::<Envelope>(r#"{"channel":"terminal.resize","cols":1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn channel_names() {
        assert_eq!(ChannelMessage::Output(vec![]).channel(), "terminal.output");
        assert_eq!(ChannelMessage::Input(vec![]).channel(), "terminal.input");
    }
}
