use std::fmt;

use crate::codec::{ETX, STX};

/// Render bytes as text with the markers spelled out as `<STX>` / `<ETX>`.
///
/// Invalid UTF-8 is replaced, so the result is always printable.
pub fn pretty(bytes: &[u8]) -> String {
    Pretty(bytes).to_string()
}

/// Lazy [`pretty`] for use in log fields.
#[derive(Clone, Copy)]
pub struct Pretty<'a>(pub &'a [u8]);

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.utf8_chunks() {
            for c in chunk.valid().chars() {
                match c as u32 {
                    b if b == u32::from(STX) => f.write_str("<STX>")?,
                    b if b == u32::from(ETX) => f.write_str("<ETX>")?,
                    _ => fmt::Write::write_char(f, c)?,
                }
            }
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
