/// Scrub rendered text before it reaches the terminal.
///
/// Log content is attacker-influenced (anything a client sends may end up
/// in a message field), so control characters are stripped rather than
/// passed through: tabs expand to four spaces, newlines collapse to a
/// single space, everything else below U+0020 and in the C1 range is
/// dropped. Printable text, including multi-byte characters, is kept
/// untouched.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for ch in input.chars() {
        match ch {
            '\t' => out.push_str("    "),
            '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}
