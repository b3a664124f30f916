/// Renders a prompt template by substituting `{{.FIELD}}` placeholders.
/// Unknown placeholders are left in place so a template/config mismatch is
/// visible in the rendered prompt rather than silently dropped.
#[must_use]
pub fn render_prompt(template: &str, vocabulary: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (field, value) in vocabulary {
        rendered = rendered.replace(&format!("{{{{.{field}}}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_placeholders() {
        let rendered = render_prompt(
            "Scene {{.SEQUENCE}}: {{.TIME_START}} to {{.TIME_END}} of {{.TIME_START}}",
            &[
                ("SEQUENCE", "2"),
                ("TIME_START", "00:00:06"),
                ("TIME_END", "00:00:10"),
            ],
        );
        assert_eq!(rendered, "Scene 2: 00:00:06 to 00:00:10 of 00:00:06");
    }

    #[test]
    fn unknown_placeholders_stay_visible() {
        let rendered = render_prompt("{{.KNOWN}} and {{.UNKNOWN}}", &[("KNOWN", "yes")]);
        assert_eq!(rendered, "yes and {{.UNKNOWN}}");
    }
}
