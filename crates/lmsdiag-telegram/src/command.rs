use std::fmt;

/// Variable name of the scan data telegram.
pub const SCAN_DATA: &str = "LMDscandata";

/// Commands the diagnostic client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `sRN LMDscandata`: read the latest scan once.
    ReadScanData,
    /// `sEN LMDscandata 0|1`: stop or start continuous scan output.
    ScanDataStreaming(bool),
}

impl Command {
    /// The acknowledgement the device echoes for this command, if fixed.
    ///
    /// `ReadScanData` is answered by a telegram, which has no fixed text.
    pub fn expected_reply(&self) -> Option<String> {
        match self {
            Command::ReadScanData => None,
            Command::ScanDataStreaming(on) => Some(format!("sEA {SCAN_DATA} {}", u8::from(*on))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ReadScanData => write!(f, "sRN {SCAN_DATA}"),
            Command::ScanDataStreaming(on) => write!(f, "sEN {SCAN_DATA} {}", u8::from(*on)),
        }
    }
}

/// What a received frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A scan telegram: polled (`sRA`) or streamed (`sSN`) `LMDscandata`.
    ScanData,
    /// Anything else: acknowledgements, errors, other variables.
    Reply,
}

impl FrameKind {
    /// Classify a frame body by its first two tokens.
    pub fn of(body: &str) -> Self {
        let mut tokens = body.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("sRA" | "sSN"), Some(SCAN_DATA)) => FrameKind::ScanData,
            _ => FrameKind::Reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_text() {
        assert_eq!(Command::ReadScanData.to_string(), "sRN LMDscandata");
        assert_eq!(
            Command::ScanDataStreaming(true).to_string(),
            "sEN LMDscandata 1"
        );
        assert_eq!(
            Command::ScanDataStreaming(false).to_string(),
            "sEN LMDscandata 0"
        );
    }

    #[test]
    fn streaming_acknowledgement() {
        assert_eq!(
            Command::ScanDataStreaming(true).expected_reply().as_deref(),
            Some("sEA LMDscandata 1")
        );
        assert_eq!(Command::ReadScanData.expected_reply(), None);
    }

    #[test]
    fn classifies_scan_telegrams() {
        assert_eq!(FrameKind::of("sRA LMDscandata 1 0 12345"), FrameKind::ScanData);
        assert_eq!(FrameKind::of("sSN LMDscandata 1 0 12345"), FrameKind::ScanData);
    }

    #[test]
    fn classifies_replies() {
        assert_eq!(FrameKind::of("sEA LMDscandata 0"), FrameKind::Reply);
        assert_eq!(FrameKind::of("sFA 1"), FrameKind::Reply);
        assert_eq!(FrameKind::of("sRA"), FrameKind::Reply);
        assert_eq!(FrameKind::of(""), FrameKind::Reply);
    }
}
