use loglens_types::LogRecord;

/// One parsed piece of a display template
#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Field {
        name: String,
        width: Option<usize>,
        left_justify: bool,
    },
}

/// A display template with `%(field)s` directives.
///
/// `%(field)s` renders the field verbatim, `%(field)-Ns` left-justifies
/// to width N, `%(field)Ns` right-justifies. Malformed directives pass
/// through as literal text; unknown fields render empty.
#[derive(Clone, Debug)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(pos) = rest.find("%(") {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];

            match parse_directive(after) {
                Some((segment, consumed)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &after[consumed..];
                }
                None => {
                    literal.push_str("%(");
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Format a record. Padding counts characters, not bytes; values
    /// wider than the requested width are not truncated.
    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    name,
                    width,
                    left_justify,
                } => {
                    let value = record.field_text(name);
                    match width {
                        None => out.push_str(&value),
                        Some(width) => {
                            let len = value.chars().count();
                            let pad = width.saturating_sub(len);
                            if *left_justify {
                                out.push_str(&value);
                                out.extend(std::iter::repeat_n(' ', pad));
                            } else {
                                out.extend(std::iter::repeat_n(' ', pad));
                                out.push_str(&value);
                            }
                        }
                    }
                }
            }
        }

        out
    }
}

/// Parse the remainder of a directive after `%(`. Returns the segment
/// and how many bytes of `s` were consumed.
fn parse_directive(s: &str) -> Option<(Segment, usize)> {
    let close = s.find(')')?;
    let name = &s[..close];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let bytes = s.as_bytes();
    let mut idx = close + 1;

    let left_justify = if bytes.get(idx) == Some(&b'-') {
        idx += 1;
        true
    } else {
        false
    };

    let width_start = idx;
    while idx < s.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let width = if idx > width_start {
        Some(s[width_start..idx].parse().ok()?)
    } else {
        None
    };

    // A '-' flag without a width is malformed
    if left_justify && width.is_none() {
        return None;
    }

    if bytes.get(idx) != Some(&b's') {
        return None;
    }

    Some((
        Segment::Field {
            name: name.to_string(),
            width,
            left_justify,
        },
        idx + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: serde_json::Value) -> LogRecord {
        LogRecord::from_value(fields).unwrap()
    }

    #[test]
    fn test_verbatim_field() {
        let t = Template::parse("%(message)s");
        let r = record(json!({"message": "hello"}));
        assert_eq!(t.render(&r), "hello");
    }

    #[test]
    fn test_left_justified_padding() {
        let t = Template::parse("%(level)-5s %(message)s");
        let r = record(json!({"level": "INFO", "message": "ok"}));
        assert_eq!(t.render(&r), "INFO  ok");
    }

    #[test]
    fn test_right_justified_padding() {
        let t = Template::parse("[%(process)6s]");
        let r = record(json!({"process": "1234"}));
        assert_eq!(t.render(&r), "[  1234]");
    }

    #[test]
    fn test_value_wider_than_width_not_truncated() {
        let t = Template::parse("%(module)-4s|");
        let r = record(json!({"module": "gallery_service"}));
        assert_eq!(t.render(&r), "gallery_service|");
    }

    #[test]
    fn test_unknown_field_renders_empty() {
        let t = Template::parse("<%(nope)s>");
        let r = record(json!({"message": "x"}));
        assert_eq!(t.render(&r), "<>");
    }

    #[test]
    fn test_numeric_field() {
        let t = Template::parse("%(count)s items");
        let r = record(json!({"count": 7}));
        assert_eq!(t.render(&r), "7 items");
    }

    #[test]
    fn test_malformed_directive_is_literal() {
        let t = Template::parse("100%(done %(message)s");
        let r = record(json!({"message": "ok"}));
        assert_eq!(t.render(&r), "100%(done ok");
    }

    #[test]
    fn test_service_default_template_shape() {
        let t = Template::parse(loglens_types::DEFAULT_TEMPLATE);
        let r = record(json!({
            "asctime": "01.02.2026 10:30:00",
            "msecs": "042",
            "module": "logs_service",
            "process": "77",
            "levelname": "INF",
            "message": "stream connected",
        }));
        let rendered = t.render(&r);
        assert!(rendered.starts_with("[ 01.02.2026 10:30:00.042 logs_service"));
        assert!(rendered.ends_with("][77][INF] stream connected"));
    }
}
