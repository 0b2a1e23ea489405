use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tagwire_codec::Message;

use crate::message::CliMessage;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    timestamp: String,
}

impl<'a> MessageOutput<'a> {
    fn new(msg: &'a CliMessage) -> Self {
        let (seq, text) = match msg {
            CliMessage::Text { text, .. } => (None, Some(text.as_str())),
            CliMessage::Ping { seq, .. } => (Some(*seq), None),
        };
        Self {
            kind: msg.kind().as_str(),
            seq,
            text,
            reply_to: msg.reply_to(),
            timestamp: now_unix_seconds(),
        }
    }

    fn body(&self) -> String {
        match (self.seq, self.text) {
            (Some(seq), _) => format!("seq={seq}"),
            (None, Some(text)) => text.to_string(),
            (None, None) => String::new(),
        }
    }
}

pub fn render_message(msg: &CliMessage, format: OutputFormat) -> String {
    let out = MessageOutput::new(msg);
    match format {
        OutputFormat::Json => {
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "BODY", "REPLY TO"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.body(),
                    out.reply_to.unwrap_or("-").to_string(),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!(
            "kind={} {} reply_to={}",
            out.kind,
            out.body(),
            out.reply_to.unwrap_or("-")
        ),
    }
}

pub fn print_message(msg: &CliMessage, format: OutputFormat) {
    println!("{}", render_message(msg, format));
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_skips_absent_fields() {
        let msg = CliMessage::Ping {
            seq: 4,
            reply_to: None,
        };
        let rendered = render_message(&msg, OutputFormat::Json);
        assert!(rendered.starts_with(r#"{"kind":"ping","seq":4,"timestamp":"#));
        assert!(!rendered.contains("reply_to"));
    }

    #[test]
    fn pretty_shows_text_and_reply_path() {
        let msg = CliMessage::Text {
            text: "hello".to_string(),
            reply_to: Some("/tmp/me.sock".to_string()),
        };
        assert_eq!(
            render_message(&msg, OutputFormat::Pretty),
            "kind=text hello reply_to=/tmp/me.sock"
        );
        assert!(render_message(&msg, OutputFormat::Table).contains("hello"));
    }
}
