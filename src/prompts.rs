pub const SUGGESTION_SYSTEM: &str = include_str!("../data/prompts/suggestion_system.txt");
pub const COMPOSITION: &str = include_str!("../data/prompts/composition.txt");
pub const DEFAULT_STYLE: &str = include_str!("../data/prompts/default_style.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Composition instruction for callers that only send a style prompt.
pub fn composition_prompt(style: Option<&str>) -> String {
    let style = style
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STYLE.trim());
    render(COMPOSITION, &[("style", style)]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!SUGGESTION_SYSTEM.trim().is_empty());
        assert!(!COMPOSITION.trim().is_empty());
        assert!(!DEFAULT_STYLE.trim().is_empty());
    }

    #[test]
    fn test_composition_has_style_placeholder() {
        assert!(COMPOSITION.contains("{{style}}"));
    }

    #[test]
    fn test_composition_prompt_uses_caller_style() {
        let prompt = composition_prompt(Some("  neon-lit street at night "));
        assert!(prompt.ends_with("Style and scene: neon-lit street at night"));
        assert!(!prompt.contains("{{style}}"));
    }

    #[test]
    fn test_composition_prompt_falls_back_to_default_style() {
        assert!(composition_prompt(None).contains(DEFAULT_STYLE.trim()));
        assert!(composition_prompt(Some("   ")).contains(DEFAULT_STYLE.trim()));
    }
}
