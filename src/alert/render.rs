//! Alert rendering from change events.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::monitor::ChangeEvent;

/// Embed colour for health drops.
pub const HEALTH_COLOR: u32 = 0x00E7_4C3C;

/// Embed colour for new item listings.
pub const ITEMS_COLOR: u32 = 0x002E_CC71;

/// Footer shown on every alert.
pub const FOOTER: &str = "basewatch base tracker";

const HEALTH_TITLE: &str = "health_title";
const HEALTH_DESCRIPTION: &str = "health_description";
const ITEMS_TITLE: &str = "items_title";
const ITEMS_DESCRIPTION: &str = "items_description";

const TEMPLATES: [(&str, &str); 4] = [
    (HEALTH_TITLE, "Base Under Attack: {{key}}"),
    (
        HEALTH_DESCRIPTION,
        "Base owned by **{{owner}}** took damage!\nHealth: {{old_health}}% -> **{{new_health}}%**",
    ),
    (ITEMS_TITLE, "New Public Items: {{key}}"),
    (
        ITEMS_DESCRIPTION,
        "New goods at **{{owner}}**'s base.\nItems: {{items}}",
    ),
];

/// Error raised while rendering an alert.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A built-in template failed to compile.
    #[error("Invalid alert template: {0}")]
    Template(#[source] Box<handlebars::TemplateError>),

    /// Rendering a template with the event data failed.
    #[error("Failed to render alert: {0}")]
    Render(#[source] Box<handlebars::RenderError>),
}

/// One name/value pair shown in an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertField {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether the field may share a row with its neighbours.
    pub inline: bool,
}

/// A rendered, transport-neutral alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Headline.
    pub title: String,
    /// Body text (Markdown).
    pub description: String,
    /// RGB colour.
    pub color: u32,
    /// Extra fields.
    pub fields: Vec<AlertField>,
    /// Footer text.
    pub footer: String,
}

impl Alert {
    /// Converts the alert to a Discord embed object.
    #[must_use]
    pub fn to_embed(&self) -> Value {
        json!({
            "title": self.title,
            "description": self.description,
            "color": self.color,
            "fields": self.fields,
            "footer": { "text": self.footer },
        })
    }
}

#[derive(Serialize)]
struct HealthData<'a> {
    key: &'a str,
    owner: &'a str,
    old_health: String,
    new_health: String,
}

#[derive(Serialize)]
struct ItemsData<'a> {
    key: &'a str,
    owner: &'a str,
    items: &'a str,
}

/// Deterministic renderer with its templates compiled once.
///
/// Strict mode is on, so a template referencing a missing variable fails
/// instead of rendering an empty string. HTML escaping is off because the
/// output is chat Markdown, not HTML.
#[derive(Debug)]
pub struct AlertRenderer {
    registry: Handlebars<'static>,
}

impl AlertRenderer {
    /// Compiles the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if a template does not compile.
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        for (name, template) in TEMPLATES {
            registry
                .register_template_string(name, template)
                .map_err(|e| RenderError::Template(Box::new(e)))?;
        }
        Ok(Self { registry })
    }

    /// Renders the alert for one event.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Render`] if the event data does not fit the
    /// templates.
    pub fn render(&self, event: &ChangeEvent) -> Result<Alert, RenderError> {
        match event {
            ChangeEvent::HealthDropped {
                key,
                owner,
                old_health,
                new_health,
            } => {
                let data = HealthData {
                    key,
                    owner,
                    old_health: format_health(*old_health),
                    new_health: format_health(*new_health),
                };
                Ok(Alert {
                    title: self.render_one(HEALTH_TITLE, &data)?,
                    description: self.render_one(HEALTH_DESCRIPTION, &data)?,
                    color: HEALTH_COLOR,
                    fields: vec![
                        AlertField {
                            name: "Previous Health".to_string(),
                            value: format!("{}%", data.old_health),
                            inline: true,
                        },
                        AlertField {
                            name: "Current Health".to_string(),
                            value: format!("{}%", data.new_health),
                            inline: true,
                        },
                    ],
                    footer: FOOTER.to_string(),
                })
            }
            ChangeEvent::NewItemsListed { key, owner, items } => {
                let data = ItemsData { key, owner, items };
                Ok(Alert {
                    title: self.render_one(ITEMS_TITLE, &data)?,
                    description: self.render_one(ITEMS_DESCRIPTION, &data)?,
                    color: ITEMS_COLOR,
                    fields: Vec::new(),
                    footer: FOOTER.to_string(),
                })
            }
        }
    }

    fn render_one<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry
            .render(name, data)
            .map_err(|e| RenderError::Render(Box::new(e)))
    }
}

/// Formats a health value without a trailing `.0` for whole numbers.
fn format_health(value: f64) -> String {
    format!("{value}")
}
