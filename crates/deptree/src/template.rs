use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub(crate) fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes a value for a single-quoted Groovy string.
pub(crate) fn escape_groovy(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `base64(user:secret)`, the npm `_auth` form.
pub(crate) fn basic_auth(user: &str, secret: &str) -> String {
    STANDARD.encode(format!("{user}:{secret}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_special_characters_are_escaped() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }

    #[test]
    fn groovy_quotes_are_escaped() {
        assert_eq!(escape_groovy(r"it's\here"), r"it\'s\\here");
    }

    #[test]
    fn basic_auth_is_base64() {
        assert_eq!(basic_auth("user", "pass"), "dXNlcjpwYXNz");
    }
}
