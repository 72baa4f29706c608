/// Expand `${NAME}` references in a config file using the process environment.
///
/// Unknown variables and unterminated references are copied through unchanged.
pub fn substitute_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        let value = if name.is_empty() {
            None
        } else {
            lookup(name)
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "EBAY_APP_ID" => Some("app-123".into()),
            "PORT" => Some("5000".into()),
            _ => None,
        }
    }

    #[test]
    fn expands_known_names() {
        assert_eq!(
            expand_with("id=${EBAY_APP_ID} port=${PORT}", lookup),
            "id=app-123 port=5000"
        );
    }

    #[test]
    fn keeps_unknown_and_empty_names() {
        assert_eq!(expand_with("${NOPE}", lookup), "${NOPE}");
        assert_eq!(expand_with("a${}b", lookup), "a${}b");
    }

    #[test]
    fn keeps_unterminated_reference() {
        assert_eq!(expand_with("x=${PORT", lookup), "x=${PORT");
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(substitute_env("bind = \"0.0.0.0\""), "bind = \"0.0.0.0\"");
    }
}
