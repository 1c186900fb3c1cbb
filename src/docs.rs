//! Documentation page served next to the generated spec.
//!
//! The page is a thin HTML shell; the viewer itself is loaded from a CDN.

use serde::Deserialize;

/// Which viewer renders the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocsProvider {
    #[default]
    SwaggerUi,
    Redoc,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub provider: DocsProvider,
    pub title: String,
    pub description: String,
    pub favicon_url: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            provider: DocsProvider::SwaggerUi,
            title: "API Reference".to_string(),
            description: "Generated API documentation.".to_string(),
            favicon_url: None,
            logo_url: None,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the documentation page for the document served at `spec_url`.
pub fn render_docs_html(config: &DocsConfig, spec_url: &str) -> String {
    let title = escape_html(&config.title);
    let description = escape_html(&config.description);
    let spec_url = escape_html(spec_url);
    let favicon = config
        .favicon_url
        .as_deref()
        .map(|url| format!("\n  <link rel=\"icon\" href=\"{}\" />", escape_html(url)))
        .unwrap_or_default();
    let logo = config
        .logo_url
        .as_deref()
        .map(|url| format!("\n<img src=\"{}\" alt=\"{}\" style=\"height: 48px\" />", escape_html(url), title))
        .unwrap_or_default();

    let (head, body) = match config.provider {
        DocsProvider::SwaggerUi => (
            "<link rel=\"stylesheet\" href=\"https://unpkg.com/swagger-ui-dist@5/swagger-ui.css\" />".to_string(),
            format!(
                r#"<div id="swagger-ui"></div>
<script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
<script>
  window.onload = () => {{
    window.ui = SwaggerUIBundle({{
      url: '{spec_url}',
      dom_id: '#swagger-ui',
      presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
      layout: 'StandaloneLayout',
    }});
  }};
</script>"#
            ),
        ),
        DocsProvider::Redoc => (
            String::new(),
            format!(
                r#"<redoc spec-url="{spec_url}"></redoc>
<script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>"#
            ),
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <meta name="description" content="{description}" />
  <title>{title}</title>{favicon}
  {head}
</head>
<body>{logo}
{body}
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: DocsProvider) -> DocsConfig {
        DocsConfig {
            provider,
            title: "foo".to_string(),
            description: "bar".to_string(),
            favicon_url: Some("baz.ico".to_string()),
            logo_url: Some("qux.jpeg".to_string()),
        }
    }

    #[test]
    fn test_swagger_ui_page() {
        let html = render_docs_html(&config(DocsProvider::SwaggerUi), "/openapi.yaml");

        assert!(html.contains("<title>foo</title>"));
        assert!(html.contains("content=\"bar\""));
        assert!(html.contains("baz.ico"));
        assert!(html.contains("qux.jpeg"));
        assert!(html.contains("SwaggerUIBundle"));
        assert!(html.contains("url: '/openapi.yaml'"));
    }

    #[test]
    fn test_redoc_page() {
        let html = render_docs_html(&config(DocsProvider::Redoc), "/openapi.json");

        assert!(html.contains("<redoc spec-url=\"/openapi.json\">"));
        assert!(!html.contains("SwaggerUIBundle"));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut docs = DocsConfig::default();
        docs.title = "<script>".to_string();

        let html = render_docs_html(&docs, "/openapi.json");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<title><script>"));
    }

    #[test]
    fn test_provider_names() {
        let provider: DocsProvider = serde_json::from_str("\"swagger-ui\"").unwrap();
        assert_eq!(provider, DocsProvider::SwaggerUi);
        let provider: DocsProvider = serde_json::from_str("\"redoc\"").unwrap();
        assert_eq!(provider, DocsProvider::Redoc);
    }
}
