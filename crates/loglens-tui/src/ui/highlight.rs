//! Mask-driven match highlighting over styled lines.
//!
//! [`highlight_line`] is the renderer half of the highlight pipeline:
//! the mask comes from `loglens_query::build_mask` over the plain text,
//! and is walked here against the (possibly already styled) span tree.
//! Existing spans are only ever split and wrapped; their own styling is
//! preserved underneath the patched highlight.

use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Wrap the masked character runs of `line` in `highlight`.
///
/// Walks every span's text in plain-text character order without
/// consuming mask slots for span boundaries; a span whose characters
/// straddle a false→true transition is split at the transition. Mask
/// slots beyond the text (or missing ones) count as unhighlighted.
pub fn highlight_line(line: &Line<'_>, mask: &[bool], highlight: Style) -> Line<'static> {
    let mut out: Vec<Span<'static>> = Vec::new();
    let mut idx = 0usize;

    for span in &line.spans {
        let base = span.style;
        let mut run = String::new();
        let mut run_highlighted: Option<bool> = None;

        for ch in span.content.chars() {
            let highlighted = mask.get(idx).copied().unwrap_or(false);
            idx += 1;

            if run_highlighted != Some(highlighted) {
                flush(&mut out, &mut run, base, run_highlighted, highlight);
                run_highlighted = Some(highlighted);
            }
            run.push(ch);
        }

        flush(&mut out, &mut run, base, run_highlighted, highlight);
    }

    let mut result = Line::from(out);
    result.style = line.style;
    result.alignment = line.alignment;
    result
}

fn flush(
    out: &mut Vec<Span<'static>>,
    run: &mut String,
    base: Style,
    highlighted: Option<bool>,
    highlight: Style,
) {
    if run.is_empty() {
        return;
    }
    let text = std::mem::take(run);
    let style = if highlighted == Some(true) {
        base.patch(highlight)
    } else {
        base
    };
    out.push(Span::styled(text, style));
}
