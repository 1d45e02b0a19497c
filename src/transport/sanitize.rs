//! HTML escaping for relayed text.
//!
//! Everything a client publishes is escaped before it reaches the hub, so
//! subscribers can drop payloads straight into a page.

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
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

/// The relayed form of a chat line: `"<username>: <message>"`, escaped.
pub fn chat_line(username: &str, message: &str) -> String {
    escape_html(&format!("{username}: {message}"))
}
