// crates/core/src/diagnostics.rs
//! Failure-cause classification for finished jobs.
//!
//! Jobs report problems by logging lines that start with an `Exception: ` or
//! `Error: ` marker. The most recent marked line is the most relevant one; if
//! nothing is marked, the last line logged is the best context available.

/// Generic text used when a failed job left no messages at all.
pub const GENERIC_ERROR: &str = "An error occurred.";

/// Appended to clipped text.
pub const ELLIPSIS: &str = "...";

/// Marker prefixes recognized in job messages (matched case-insensitively).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMarkers<'a> {
    pub exception: &'a str,
    pub error: &'a str,
    pub fallback: &'a str,
}

impl Default for ErrorMarkers<'static> {
    fn default() -> Self {
        Self {
            exception: "Exception: ",
            error: "Error: ",
            fallback: GENERIC_ERROR,
        }
    }
}

/// The message judged most relevant for a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedError {
    /// Message text with its marker removed.
    pub text: String,
    /// Whether the message was logged with the exception marker.
    pub is_exception: bool,
}

impl ExtractedError {
    fn new(text: impl Into<String>, is_exception: bool) -> Self {
        Self {
            text: text.into(),
            is_exception,
        }
    }
}

/// Pick the most relevant diagnostic line from a job's messages.
///
/// Scans newest to oldest. The first line carrying the exception marker wins,
/// unless a newer line carrying the error marker is found first. Unmarked logs
/// fall back to the most recent line verbatim; an empty log falls back to
/// `markers.fallback`.
pub fn extract_error_message<S: AsRef<str>>(
    messages: &[S],
    markers: &ErrorMarkers<'_>,
) -> ExtractedError {
    let Some(last) = messages.last() else {
        return ExtractedError::new(markers.fallback, false);
    };

    for message in messages.iter().rev() {
        let message = message.as_ref();
        if let Some(rest) = strip_prefix_ignore_case(message, markers.exception) {
            return ExtractedError::new(rest, true);
        }
        if let Some(rest) = strip_prefix_ignore_case(message, markers.error) {
            return ExtractedError::new(rest, false);
        }
    }

    ExtractedError::new(last.as_ref(), false)
}

/// Strip `prefix` from the start of `message`, comparing case-insensitively.
///
/// An empty prefix never matches.
fn strip_prefix_ignore_case<'m>(message: &'m str, prefix: &str) -> Option<&'m str> {
    if prefix.is_empty() {
        return None;
    }
    let mut rest = message.chars();
    for expected in prefix.chars() {
        let actual = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(rest.as_str())
}

/// Bound `text` to `limit` characters, marking truncation with [`ELLIPSIS`].
pub fn clip(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
