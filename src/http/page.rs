//! Server-rendered form page.

use std::collections::HashMap;
use std::fmt::Write;

use crate::domain::{PredictionResult, FEATURE_NAMES};

/// What the page shows under the form.
pub enum Outcome<'a> {
    Prediction(&'a PredictionResult),
    Error(&'a str),
}

pub(crate) fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

fn render_outcome(html: &mut String, outcome: &Outcome<'_>) {
    match outcome {
        Outcome::Error(message) => {
            let _ = write!(
                html,
                r#"<div class="banner error">{}</div>"#,
                escape(message)
            );
        }
        Outcome::Prediction(result) => {
            let _ = write!(
                html,
                r#"<div class="banner {kind}">
<h2>{class}</h2>
<table>
<tr><th>Model output</th><td>{original}</td></tr>
<tr><th>P(hepatitis)</th><td>{pos}</td></tr>
<tr><th>P(no hepatitis)</th><td>{neg}</td></tr>
<tr><th>Confidence</th><td>{confidence}</td></tr>
</table>
<p class="note">{message}</p>
</div>"#,
                kind = if result.degenerate { "warning" } else { "ok" },
                class = result.corrected_class.display_name(),
                original = result.raw_class.display_name(),
                pos = percent(result.probabilities.positive()),
                neg = percent(result.probabilities.negative()),
                confidence = percent(result.confidence),
                message = escape(&result.message),
            );
        }
    }
}

/// Render the form, refilled with `values`, followed by `outcome` if any.
#[must_use]
pub fn render(values: &HashMap<String, String>, outcome: Option<Outcome<'_>>) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Hepatitis risk prediction</title>
<style>
body { font-family: sans-serif; max-width: 52rem; margin: 2rem auto; }
form { display: grid; grid-template-columns: repeat(3, 1fr); gap: 0.6rem 1rem; }
label { display: flex; flex-direction: column; font-size: 0.9rem; }
button { grid-column: 1 / -1; padding: 0.6rem; }
.banner { margin-top: 1.5rem; padding: 1rem; border-radius: 4px; }
.ok { background: #e6f4ea; }
.warning { background: #fff4e5; }
.error { background: #fdecea; }
</style>
</head>
<body>
<h1>Hepatitis risk prediction</h1>
<form method="post" action="/predict">
"#,
    );

    for name in FEATURE_NAMES {
        let value = values.get(name).map(String::as_str).unwrap_or("");
        let _ = writeln!(
            html,
            r#"<label>{name}<input type="number" step="any" name="{name}" value="{}" required></label>"#,
            escape(value)
        );
    }
    html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    if let Some(outcome) = outcome {
        render_outcome(&mut html, &outcome);
    }

    html.push_str("\n</body>\n</html>\n");
    html
}
