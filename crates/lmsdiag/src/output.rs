use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lmsdiag_frame::{pretty, Frame};
use lmsdiag_telegram::{decode_scan_data, FieldMap, FrameKind};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct FrameOutput<'a> {
    kind: &'static str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<&'static str>,
    timestamp: String,
}

/// Print one received frame. Returns its kind so callers can count telegrams.
pub fn print_frame(frame: &Frame, format: OutputFormat) -> FrameKind {
    let body = frame.text();
    let kind = FrameKind::of(&body);

    match format {
        OutputFormat::Json => println!("{}", render_json(frame, &body, kind)),
        OutputFormat::Table => println!("{}", render_table(frame, &body, kind)),
        OutputFormat::Pretty => print!("{}", render_pretty(frame, &body, kind)),
        OutputFormat::Raw => println!("{}", pretty(&frame.payload)),
    }
    kind
}

fn render_json(frame: &Frame, body: &str, kind: FrameKind) -> String {
    let fields = match kind {
        FrameKind::ScanData => Some(decode_scan_data(body)),
        FrameKind::Reply => None,
    };
    let out = FrameOutput {
        kind: kind_name(kind),
        size: frame.payload.len(),
        fields: fields.as_ref(),
        body: fields.is_none().then_some(body),
        diagnostics: diagnostic_names(frame),
        timestamp: now_unix_seconds(),
    };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
}

fn render_table(frame: &Frame, body: &str, kind: FrameKind) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match kind {
        FrameKind::ScanData => {
            table.set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in decode_scan_data(body).iter() {
                table.add_row(vec![field, value]);
            }
        }
        FrameKind::Reply => {
            table
                .set_header(vec!["REPLY", "SIZE"])
                .add_row(vec![body.to_string(), frame.payload.len().to_string()]);
        }
    }
    for name in diagnostic_names(frame) {
        table.add_row(vec!["malformed", name]);
    }
    table
}

fn render_pretty(frame: &Frame, body: &str, kind: FrameKind) -> String {
    let mut out = String::new();
    match kind {
        FrameKind::ScanData => {
            for (field, value) in decode_scan_data(body).iter() {
                out.push_str(&format!("{field}: {value}\n"));
            }
        }
        FrameKind::Reply => out.push_str(&format!("reply: {}\n", pretty(&frame.payload))),
    }
    for diag in &frame.diagnostics {
        out.push_str(&format!("malformed: {diag}\n"));
    }
    out
}

fn kind_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::ScanData => "scan_data",
        FrameKind::Reply => "reply",
    }
}

fn diagnostic_names(frame: &Frame) -> Vec<&'static str> {
    frame.diagnostics.iter().map(|d| d.kind.as_str()).collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
