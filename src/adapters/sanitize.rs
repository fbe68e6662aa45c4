//! Log sanitization for clinical values.
//!
//! Prediction payloads are patient data. Handlers avoid logging them, but a
//! stray `{:?}` of a request map would put lab values in the log. The
//! [`SanitizingMakeWriter`] wraps the log sink and rewrites every formatted
//! line before it is written:
//! - `Bilirubin: 8.5`, `"Albumin":2.0`, `Age=65` become `<name>=[REDACTED]`
//! - email addresses and UUIDs are masked
//!
//! Input is capped (`HEPATICA_SANITIZE_MAX_BYTES`, 16 KiB by default) so an
//! oversized line cannot make sanitization expensive.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_NAMES;

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Rules {
    any: RegexSet,
    rules: Vec<Rule>,
}

static RULES: OnceLock<Rules> = OnceLock::new();

fn feature_value_pattern() -> String {
    let names = FEATURE_NAMES.join("|");
    // Name, optional closing quote, separator, then a bare or quoted number.
    format!(r#"\b({names})"?\s*[:=]\s*"?[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?"?"#)
}

fn rules() -> &'static Rules {
    RULES.get_or_init(|| {
        let table: Vec<(String, &'static str)> = vec![
            (feature_value_pattern(), "${1}=[REDACTED]"),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
                    .to_string(),
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b[a-z0-9._%+-]{1,64}@(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}\b".to_string(),
                "[REDACTED-EMAIL]",
            ),
        ];

        // The patterns are fixed at compile time; failing here is a programming error.
        let any = RegexSet::new(table.iter().map(|(p, _)| p.as_str()))
            .expect("sanitizer patterns compile");
        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(&pattern).expect("sanitizer pattern compiles"),
                replacement,
            })
            .collect();

        Rules { any, rules }
    })
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEPATICA_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Mask clinical values, emails and UUIDs in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut out = prefix.to_string();
    for idx in rules.any.matches(prefix).into_iter() {
        let rule = &rules.rules[idx];
        out = rule.regex.replace_all(&out, rule.replacement).into_owned();
    }

    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// `MakeWriter` that sanitizes each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_complete_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_complete_lines()?;

        // A line with no newline in sight is flushed in one piece.
        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_complete_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_redacts_feature_values_in_common_shapes() {
        let line = r#"payload {"Bilirubin": 8.5, "Albumin":"2.0"} Age=65 Protime: 25"#;
        let out = sanitize(line);

        assert!(out.contains("Bilirubin=[REDACTED]"));
        assert!(out.contains("Albumin=[REDACTED]"));
        assert!(out.contains("Age=[REDACTED]"));
        assert!(out.contains("Protime=[REDACTED]"));
        assert!(!out.contains("8.5"));
        assert!(!out.contains("65"));
    }

    #[test]
    fn test_leaves_summary_lines_alone() {
        let line = "Prediction complete: raw=0, corrected=1, p_pos=0.3500, confidence=65.00%";
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_redacts_email_and_uuid() {
        let out = sanitize("user doctor@clinic.org request 550e8400-e29b-41d4-a716-446655440000");
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(!out.contains("clinic.org"));
    }

    #[test]
    fn test_truncates_large_input() {
        let out = sanitize_with_limit("Sgot=120 and a long tail of text", 12);
        assert!(out.ends_with("[TRUNCATED]"));
        assert!(!out.contains("120"));
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Sink {
        type Writer = Sink;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_writer_sanitizes_split_writes() {
        let sink = Sink::default();
        let make = SanitizingMakeWriter::new(sink.clone());

        {
            let mut w = make.make_writer();
            w.write_all(b"Received Bilirub").expect("write");
            w.write_all(b"in: 8.5\nnext line").expect("write");
        }

        let written = String::from_utf8(sink.0.lock().expect("sink lock").clone()).expect("utf8");
        assert_eq!(written, "Received Bilirubin=[REDACTED]\nnext line");
    }
}
