//! HTML escaping helpers.

/// Escapes text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Makes serialized JSON safe to embed inside a `<script>` element.
///
/// `</` becomes `<\/`, which is the same string to a JSON parser.
#[must_use]
pub fn json_for_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
        assert_eq!(escape("Waypoint Test 4"), "Waypoint Test 4");
    }

    #[test]
    fn script_json_round_trips() {
        let json = r#"{"popup":"<a></a>"}"#;
        let embedded = json_for_script(json);
        assert!(!embedded.contains("</"));
        let a: serde_json::Value = serde_json::from_str(json).unwrap();
        let b: serde_json::Value = serde_json::from_str(&embedded).unwrap();
        assert_eq!(a, b);
    }
}
