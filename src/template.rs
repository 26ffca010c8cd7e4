use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Name of the built-in conversion prompt template.
pub(crate) const PROMPT_TEMPLATE: &str = "prompt";

/// Name of the built-in page template. The `.html` suffix turns on escaping.
pub(crate) const PAGE_TEMPLATE: &str = "index.html";

/// Template engine for the conversion prompt and the web page.
#[derive(Debug)]
pub(crate) struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Creates a new template engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error if template registration fails.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Register built-in templates
        Self::register_builtin_templates(&mut tera)?;

        // Register custom filters
        Self::register_filters(&mut tera);

        Ok(Self { tera })
    }

    /// Registers the prompt and page templates.
    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        tera.add_raw_template(PROMPT_TEMPLATE, include_str!("../templates/prompt.tera"))
            .map_err(|e| Error::template(PROMPT_TEMPLATE, e))?;

        tera.add_raw_template(PAGE_TEMPLATE, include_str!("../templates/index.html.tera"))
            .map_err(|e| Error::template(PAGE_TEMPLATE, e))?;

        Ok(())
    }

    /// Registers custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("detect_language", Self::detect_language_filter);
    }

    /// Maps a filename to its highlighting language.
    fn detect_language_filter(
        value: &Value,
        _args: &HashMap<String, Value>,
    ) -> tera::Result<Value> {
        let language = value.as_str().map_or("plaintext", crate::upload::language_for);
        Ok(Value::String(language.to_string()))
    }

    /// Renders the conversion prompt around `source`.
    ///
    /// The prompt template is not HTML, so `source` is inserted verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render_prompt(&self, source: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("source", source);

        self.tera
            .render(PROMPT_TEMPLATE, &context)
            .map_err(|e| Error::template(PROMPT_TEMPLATE, e))
    }

    /// Renders the page template with `view` bound to `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render_page<T: Serialize>(&self, view: &T) -> Result<String> {
        let mut context = Context::new();
        context.insert("ctx", view);

        self.tera
            .render(PAGE_TEMPLATE, &context)
            .map_err(|e| Error::template(PAGE_TEMPLATE, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_engine_creation() {
        let engine = TemplateEngine::new();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_prompt_is_not_escaped() {
        let engine = TemplateEngine::new().unwrap();
        let source = "cy.get('a[href=\"/x\"]').should('have.text', '<b>&</b>')";

        let rendered = engine.render_prompt(source).unwrap();
        assert!(rendered.contains(source));
    }

    #[test]
    fn test_prompt_keeps_template_syntax_in_source() {
        let engine = TemplateEngine::new().unwrap();
        let source = "const t = `{{ user }}`; {% raw %}";

        let rendered = engine.render_prompt(source).unwrap();
        assert!(rendered.contains(source));
    }

    #[test]
    fn test_page_is_escaped() {
        #[derive(Serialize)]
        struct View<'a> {
            title: &'a str,
            model: &'a str,
            max_upload_mb: usize,
            error: Option<&'a str>,
            source: Option<()>,
            converted: Option<()>,
        }

        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render_page(&View {
                title: "Converter",
                model: "gpt-4",
                max_upload_mb: 200,
                error: Some("<script>alert(1)</script>"),
                source: None,
                converted: None,
            })
            .unwrap();

        assert!(rendered.contains("&lt;script&gt;alert(1)&lt;&#x2F;script&gt;"));
        assert!(!rendered.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_detect_language_filter() {
        let test_cases = vec![
            ("login.cy.js", "javascript"),
            ("login_playwright_20250101120000.spec.ts", "typescript"),
            ("unknown.xyz", "plaintext"),
        ];

        for (path, expected_lang) in test_cases {
            let value = Value::String(path.to_string());
            let result = TemplateEngine::detect_language_filter(&value, &HashMap::new()).unwrap();

            assert_eq!(result.as_str().unwrap(), expected_lang);
        }
    }

    #[test]
    fn test_detect_language_filter_non_string() {
        let result =
            TemplateEngine::detect_language_filter(&Value::Bool(true), &HashMap::new()).unwrap();
        assert_eq!(result.as_str().unwrap(), "plaintext");
    }
}
