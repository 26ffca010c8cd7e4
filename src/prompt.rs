use crate::error::Result;
use crate::template::TemplateEngine;
use std::sync::Arc;

/// Builds the conversion prompt sent to the completion endpoint.
///
/// The instructions are fixed; only the embedded source varies.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    engine: Arc<TemplateEngine>,
}

impl PromptBuilder {
    /// Creates a prompt builder backed by the built-in template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to register.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(Arc::new(TemplateEngine::new()?)))
    }

    pub(crate) const fn with_engine(engine: Arc<TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Embeds `source` verbatim in the conversion instructions.
    ///
    /// Empty or non-code input is embedded all the same.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn build(&self, source: &str) -> Result<String> {
        self.engine.render_prompt(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYPRESS: &str = r#"describe('login', () => {
  it('signs in', () => {
    cy.intercept('POST', '/api/login').as('login');
    cy.visit('/login');
    cy.get('#email').type('qa@example.com');
    cy.contains('Sign in').click();
    cy.wait('@login');
    cy.url().should('include', '/dashboard');
  });
});"#;

    fn framing(builder: &PromptBuilder) -> (String, String) {
        const SENTINEL: &str = "\u{0}SOURCE\u{0}";
        let prompt = builder.build(SENTINEL).unwrap();
        let (prefix, suffix) = prompt.split_once(SENTINEL).expect("sentinel embedded");
        (prefix.to_string(), suffix.to_string())
    }

    #[test]
    fn test_prompt_contains_source_verbatim() {
        let builder = PromptBuilder::new().unwrap();
        let prompt = builder.build(CYPRESS).unwrap();
        assert!(prompt.contains(CYPRESS));
    }

    #[test]
    fn test_prompt_instructions() {
        let prompt = PromptBuilder::new().unwrap().build("").unwrap();

        assert!(prompt.contains("import { test, expect } from '@playwright/test';"));
        assert!(prompt.contains("async ({ page }) =>"));
        assert!(prompt.contains("Replace `cy.get(...)` with `page.locator(...)`"));
        assert!(prompt.contains("`.fill()`, `.click()`, `.press()`, `.check()`"));
        assert!(prompt.contains("expect(page).toHaveURL(...)"));
        assert!(prompt.contains("`cy.intercept`, `cy.wait`, and `cy.contains`"));
        assert!(prompt.trim_end().ends_with("Playwright Test:"));
    }

    #[test]
    fn test_framing_is_fixed_across_inputs() {
        let builder = PromptBuilder::new().unwrap();
        let (prefix, suffix) = framing(&builder);

        for source in [CYPRESS, "", "not code at all", "émoji ✓ and {{ braces }}"] {
            let prompt = builder.build(source).unwrap();
            assert_eq!(prompt, format!("{prefix}{source}{suffix}"));
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = PromptBuilder::new().unwrap();
        assert_eq!(builder.build(CYPRESS).unwrap(), builder.build(CYPRESS).unwrap());
    }
}
