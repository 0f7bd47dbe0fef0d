//! Input scrubbing
//!
//! Free-text reports arrive from terminals, scanners and copy-paste; control
//! characters other than newline and tab are dropped before any strategy
//! sees the text.

/// Strip non-printable characters, keeping newline and tab.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
