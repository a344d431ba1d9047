//! `{{name}}` placeholder rendering for configured strings.

pub struct TemplateVars;

impl TemplateVars {
    pub const PROJECT: &'static str = "project";
    pub const DOMAIN: &'static str = "domain";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render(
            "git@bitbucket.org:webtourismus/{{project}}.git#{{project}}",
            &[(TemplateVars::PROJECT, "demo")],
        );
        assert_eq!(out, "git@bitbucket.org:webtourismus/demo.git#demo");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{{env}}", &[("project", "x")]), "{{env}}");
    }
}
