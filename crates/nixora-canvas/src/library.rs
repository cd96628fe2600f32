//! Component Library
//!
//! Catalog of blocks the builder can drop onto the canvas, with the default
//! props each new instance starts from and the settings the side panel edits.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::schema::Props;

/// One editable setting of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingField {
    /// Prop key the setting writes
    pub key: String,
    /// Panel label
    pub label: String,
    /// Input placeholder
    pub placeholder: String,
    /// Optional help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
}

impl SettingField {
    fn new(key: &str, label: &str, placeholder: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            helper: None,
        }
    }

    fn with_helper(mut self, helper: &str) -> Self {
        self.helper = Some(helper.to_string());
        self
    }
}

/// A droppable component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// Template key stored in `ComponentInstance::component_type`
    pub component_type: String,
    /// Display name
    pub name: String,
    /// Short description
    pub description: String,
    /// Library icon
    pub icon: String,
    /// Props every new instance starts with
    #[serde(default)]
    pub default_props: Props,
    /// Editable settings
    #[serde(default)]
    pub settings: Vec<SettingField>,
}

fn props(value: serde_json::Value) -> Props {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Props::new(),
    }
}

/// The set of component definitions known to the host
#[derive(Debug, Clone, Default)]
pub struct ComponentLibrary {
    definitions: Vec<ComponentDefinition>,
}

impl ComponentLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the built-in marketing blocks
    #[must_use]
    pub fn builtin() -> Self {
        let mut library = Self::new();

        library.register(ComponentDefinition {
            component_type: "marketing-button".into(),
            name: "Button".into(),
            description: "Call-to-action button with size and color variants.".into(),
            icon: "🔘".into(),
            default_props: props(json!({
                "text": "Click me",
                "variant": "primary",
                "size": "medium",
                "fullWidth": false
            })),
            settings: vec![
                SettingField::new("text", "Label", "Get started"),
                SettingField::new("variant", "Variant", "primary")
                    .with_helper("primary, secondary, danger or success"),
                SettingField::new("size", "Size", "medium").with_helper("small, medium or large"),
                SettingField::new("icon", "Icon", "🚀"),
                SettingField::new("href", "Link", "https://"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "marketing-text".into(),
            name: "Text".into(),
            description: "Rich text paragraph written in markdown.".into(),
            icon: "📝".into(),
            default_props: props(json!({
                "content": "Tell your story here.",
                "align": "left"
            })),
            settings: vec![
                SettingField::new("content", "Content", "Markdown text")
                    .with_helper("Supports headings, lists, links and emphasis."),
                SettingField::new("align", "Alignment", "left"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "marketing-image".into(),
            name: "Image".into(),
            description: "Responsive image with alternative text.".into(),
            icon: "🖼️".into(),
            default_props: props(json!({
                "src": "",
                "alt": ""
            })),
            settings: vec![
                SettingField::new("src", "Image URL", "https://"),
                SettingField::new("alt", "Alt text", "Describe the image"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "hero".into(),
            name: "Hero Section".into(),
            description: "Large headline block with supporting text and call-to-action buttons."
                .into(),
            icon: "✨".into(),
            default_props: props(json!({
                "headline": "Craft a compelling statement",
                "subheadline": "Expand on the value proposition",
                "primaryAction": "Get started"
            })),
            settings: vec![
                SettingField::new("headline", "Headline", "Craft a compelling statement...")
                    .with_helper("Appears above the fold across all breakpoints."),
                SettingField::new("subheadline", "Supporting copy", "Expand on the value proposition"),
                SettingField::new("primaryAction", "Primary action", "Get started"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "feature-grid".into(),
            name: "Feature Grid".into(),
            description: "Three column layout for showcasing product capabilities.".into(),
            icon: "🧩".into(),
            default_props: props(json!({
                "title": "Why teams choose us",
                "featureCount": 3,
                "background": "white"
            })),
            settings: vec![
                SettingField::new("title", "Section title", "Why teams choose us"),
                SettingField::new("featureCount", "Feature count", "3")
                    .with_helper("Controls how many cards are generated in the grid."),
                SettingField::new("background", "Background", "Gradient, image, or solid color"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "testimonials".into(),
            name: "Testimonials".into(),
            description: "Rotating carousel with social proof and client logos.".into(),
            icon: "💬".into(),
            default_props: props(json!({
                "headline": "What customers are saying",
                "accentColor": "#3b82f6"
            })),
            settings: vec![
                SettingField::new("headline", "Headline", "What customers are saying"),
                SettingField::new("quoteSource", "Quote source", "Upload CSV or connect integration"),
                SettingField::new("accentColor", "Accent color", "#3b82f6"),
            ],
        });

        library.register(ComponentDefinition {
            component_type: "cta".into(),
            name: "Call to action".into(),
            description: "Slim banner with headline, description, and form inputs.".into(),
            icon: "🚀".into(),
            default_props: props(json!({
                "message": "Ready to start building?",
                "buttonLabel": "Request access",
                "targetUrl": "#"
            })),
            settings: vec![
                SettingField::new("message", "Message", "Ready to start building?"),
                SettingField::new("buttonLabel", "Button label", "Request access"),
                SettingField::new("targetUrl", "Target URL", "https://"),
            ],
        });

        library
    }

    /// Add or replace a definition
    pub fn register(&mut self, definition: ComponentDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|d| d.component_type == definition.component_type)
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    /// Look up a definition by type
    #[must_use]
    pub fn get(&self, component_type: &str) -> Option<&ComponentDefinition> {
        self.definitions
            .iter()
            .find(|d| d.component_type == component_type)
    }

    /// All definitions in catalog order
    #[must_use]
    pub fn definitions(&self) -> &[ComponentDefinition] {
        &self.definitions
    }

    /// Defaults for `component_type` overlaid with `overrides`
    #[must_use]
    pub fn initial_props(&self, component_type: &str, overrides: Props) -> Option<Props> {
        let mut props = self.get(component_type)?.default_props.clone();
        props.extend(overrides);
        Some(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let library = ComponentLibrary::builtin();
        assert_eq!(library.definitions().len(), 7);
        assert!(library.get("marketing-button").is_some());
        assert!(library.get("unknown").is_none());
    }

    #[test]
    fn test_initial_props_overlay() {
        let library = ComponentLibrary::builtin();
        let overrides = props(json!({"text": "Buy now"}));
        let result = library.initial_props("marketing-button", overrides).unwrap();
        assert_eq!(result["text"], "Buy now");
        assert_eq!(result["variant"], "primary");
    }

    #[test]
    fn test_register_replaces() {
        let mut library = ComponentLibrary::new();
        let mut def = ComponentLibrary::builtin().get("cta").unwrap().clone();
        library.register(def.clone());
        def.name = "Banner".into();
        library.register(def);
        assert_eq!(library.definitions().len(), 1);
        assert_eq!(library.get("cta").unwrap().name, "Banner");
    }
}
