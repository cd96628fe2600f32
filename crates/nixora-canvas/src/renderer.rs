//! Template Rendering
//!
//! Resolves a component's `type` to a template and renders its props to HTML.
//! Used by the preview surface and by the published page endpoint.
//!
//! An instance whose type has no template renders a labeled placeholder; the
//! rest of the schema is unaffected.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use std::collections::HashMap;
use tracing::warn;

use crate::schema::{ComponentInstance, Schema};

/// Renders one component type
pub trait Template: Send + Sync {
    /// Render an instance to an HTML fragment
    fn render(&self, instance: &ComponentInstance) -> String;
}

impl<F> Template for F
where
    F: Fn(&ComponentInstance) -> String + Send + Sync,
{
    fn render(&self, instance: &ComponentInstance) -> String {
        self(instance)
    }
}

/// Rendered output of one instance
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedComponent {
    /// Instance id
    pub instance_id: String,
    /// Template key
    pub component_type: String,
    /// HTML fragment
    pub html: String,
    /// True when no template was registered for the type
    pub placeholder: bool,
}

/// Template lookup by component type
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Box<dyn Template>>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.templates.keys().collect();
        types.sort();
        f.debug_struct("TemplateRegistry")
            .field("types", &types)
            .finish()
    }
}

impl TemplateRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with templates for the built-in library
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("marketing-button", render_button);
        registry.register("marketing-text", render_text);
        registry.register("marketing-image", render_image);
        registry.register("hero", render_hero);
        registry.register("feature-grid", render_feature_grid);
        registry.register("testimonials", render_testimonials);
        registry.register("cta", render_cta);
        registry
    }

    /// Register (or replace) the template for a type
    pub fn register(&mut self, component_type: impl Into<String>, template: impl Template + 'static) {
        self.templates
            .insert(component_type.into(), Box::new(template));
    }

    /// Whether a template exists for the type
    #[must_use]
    pub fn has(&self, component_type: &str) -> bool {
        self.templates.contains_key(component_type)
    }

    /// Render one instance, falling back to a placeholder
    #[must_use]
    pub fn render_instance(&self, instance: &ComponentInstance) -> RenderedComponent {
        let (html, placeholder) = match self.templates.get(&instance.component_type) {
            Some(template) => (template.render(instance), false),
            None => {
                warn!(
                    instance_id = %instance.id,
                    component_type = %instance.component_type,
                    "No template for component type"
                );
                (render_placeholder(instance), true)
            }
        };
        RenderedComponent {
            instance_id: instance.id.clone(),
            component_type: instance.component_type.clone(),
            html,
            placeholder,
        }
    }

    /// Render a whole schema as a standalone published page
    #[must_use]
    pub fn render_page(&self, title: &str, schema: &Schema) -> String {
        let mut body = String::new();
        for instance in schema {
            body.push_str(&self.render_instance(instance).html);
            body.push('\n');
        }
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n\
             <title>{}</title>\n</head>\n<body>\n<main class=\"nx-page\">\n{}</main>\n</body>\n</html>\n",
            html_escape(title),
            body
        )
    }
}

/// Render markdown to HTML. Raw HTML in the source is escaped and link or
/// image targets outside the allowed schemes become `#`.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_url(&dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: sanitize_url(&dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn sanitize_url(url: &str) -> CowStr<'static> {
    CowStr::from(safe_href(url).to_string())
}

/// Escape HTML special characters
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_placeholder(instance: &ComponentInstance) -> String {
    format!(
        r#"<div class="nx-placeholder" data-component-type="{}">Unknown component: {}</div>"#,
        html_escape(&instance.component_type),
        html_escape(&instance.component_type)
    )
}

fn text<'a>(instance: &'a ComponentInstance, key: &str, fallback: &'a str) -> &'a str {
    match instance.prop_str(key) {
        Some(value) if !value.is_empty() => value,
        _ => fallback,
    }
}

/// Links are limited to http(s), mailto, relative paths and fragments
fn safe_href(href: &str) -> &str {
    let lower = href.trim().to_ascii_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with('/')
        || lower.starts_with('#');
    if allowed {
        href.trim()
    } else {
        "#"
    }
}

fn render_button(instance: &ComponentInstance) -> String {
    let variant = match instance.prop_str("variant") {
        Some("secondary") => "secondary",
        Some("danger") => "destructive",
        _ => "default",
    };
    let size = match instance.prop_str("size") {
        Some("small") => "sm",
        Some("large") => "lg",
        _ => "default",
    };
    let mut class = format!("nx-button nx-button--{variant} nx-button--{size}");
    if instance.prop_bool("fullWidth").unwrap_or(false) {
        class.push_str(" w-full");
    }

    let icon = instance
        .prop_str("icon")
        .filter(|i| !i.is_empty())
        .map(|i| format!("<span class=\"nx-button__icon\">{}</span>", html_escape(i)))
        .unwrap_or_default();
    let label = html_escape(text(instance, "text", "Button"));

    match instance.prop_str("href").filter(|h| !h.is_empty()) {
        Some(href) => format!(
            r#"<a class="{class}" href="{}">{icon}{label}</a>"#,
            html_escape(safe_href(href))
        ),
        None => format!(r#"<button type="button" class="{class}">{icon}{label}</button>"#),
    }
}

fn render_text(instance: &ComponentInstance) -> String {
    let align = match instance.prop_str("align") {
        Some("center") => "center",
        Some("right") => "right",
        _ => "left",
    };
    format!(
        r#"<div class="nx-text nx-text--{align}">{}</div>"#,
        render_markdown(text(instance, "content", ""))
    )
}

fn render_image(instance: &ComponentInstance) -> String {
    let src = text(instance, "src", "");
    if src.is_empty() {
        return r#"<div class="nx-image nx-image--empty">No image selected</div>"#.to_string();
    }
    format!(
        r#"<img class="nx-image" src="{}" alt="{}" loading="lazy" />"#,
        html_escape(safe_href(src)),
        html_escape(text(instance, "alt", ""))
    )
}

fn render_hero(instance: &ComponentInstance) -> String {
    format!(
        r#"<section class="nx-hero"><h1>{}</h1><p>{}</p><button type="button" class="nx-button nx-button--default">{}</button></section>"#,
        html_escape(text(instance, "headline", "Launch campaigns faster")),
        html_escape(text(instance, "subheadline", "")),
        html_escape(text(instance, "primaryAction", "Get started"))
    )
}

fn render_feature_grid(instance: &ComponentInstance) -> String {
    let count = instance
        .props
        .get("featureCount")
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(3)
        .clamp(1, 12);

    let cards: String = (1..=count)
        .map(|n| format!(r#"<div class="nx-feature-grid__card">Feature {n}</div>"#))
        .collect();
    format!(
        r#"<section class="nx-feature-grid" data-background="{}"><h2>{}</h2><div class="nx-feature-grid__cards">{cards}</div></section>"#,
        html_escape(text(instance, "background", "white")),
        html_escape(text(instance, "title", "Why teams choose us"))
    )
}

fn render_testimonials(instance: &ComponentInstance) -> String {
    format!(
        r#"<section class="nx-testimonials" style="--accent: {}"><h2>{}</h2></section>"#,
        html_escape(text(instance, "accentColor", "#3b82f6")),
        html_escape(text(instance, "headline", "What customers are saying"))
    )
}

fn render_cta(instance: &ComponentInstance) -> String {
    format!(
        r#"<section class="nx-cta"><p>{}</p><a class="nx-button nx-button--default" href="{}">{}</a></section>"#,
        html_escape(text(instance, "message", "Ready to start building?")),
        html_escape(safe_href(text(instance, "targetUrl", "#"))),
        html_escape(text(instance, "buttonLabel", "Request access"))
    )
}
