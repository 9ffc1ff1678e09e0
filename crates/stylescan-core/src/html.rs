//! HTML rendering of fragment lists.
//!
//! The output is a single `<pre>` element. Each fragment with classes becomes
//! a `<span class="...">`; fragments without classes are emitted as text.

use crate::fragment::FormattedText;

/// Class of the wrapping `<pre>` element unless configured otherwise.
pub const DEFAULT_CSS_CLASS: &str = "highlight";

/// Render `fragments` as HTML wrapped in `<pre class="{css_class}">`.
pub fn render(fragments: &FormattedText, css_class: &str) -> String {
    let mut html = String::new();
    html.push_str(&format!("<pre class=\"{}\">", escape(css_class)));

    for fragment in fragments {
        let classes = fragment.style.css_classes();
        match classes.first() {
            Some(first) if !first.is_empty() => {
                let classes: Vec<String> = classes.iter().map(|c| escape(c)).collect();
                html.push_str(&format!(
                    "<span class=\"{}\">{}</span>",
                    classes.join(" "),
                    escape(&fragment.text)
                ));
            }
            _ => html.push_str(&escape(&fragment.text)),
        }
    }

    html.push_str("</pre>");
    html
}

/// Escape text for element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
