//! Menu and Button Entities
//!
//! The conversational state graph: Menu nodes connected by Button edges.
//! The graph is deployment configuration, shared read-only across all
//! accounts; an account only holds a pointer to its current menu.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::message::KeyboardButton;

/// An action attached to a menu, matched against inbound text/commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    pub id: Uuid,
    pub title: String,
    /// Text displayed on the rendered keyboard.
    pub text: String,
    /// Optional text sent to the user when the button is pressed.
    pub message: Option<String>,
    /// Handler identifier resolved through the registry on press.
    pub handler: Option<String>,
    /// Menu the account moves to on press.
    pub next_menu_id: Option<Uuid>,
    /// Stable routing slug, generated exactly once at creation and never
    /// recomputed; title edits do not change it.
    pub command: String,
    pub for_staff: bool,
    pub for_admin: bool,
    pub is_inline: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Button {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let title = title.into();
        let command = generate_command(&title);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            text: text.into(),
            message: None,
            handler: None,
            next_menu_id: None,
            command,
            for_staff: false,
            for_admin: false,
            is_inline: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn with_next_menu(mut self, menu_id: Uuid) -> Self {
        self.next_menu_id = Some(menu_id);
        self
    }

    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    /// Inbound match: equality on the stable command or the display text.
    pub fn matches(&self, needle: &str) -> bool {
        self.command == needle || self.text == needle
    }

    /// Projection used when rendering this button on a keyboard.
    pub fn keyboard_button(&self) -> KeyboardButton {
        KeyboardButton {
            text: self.text.clone(),
            command: self.command.clone(),
            is_inline: self.is_inline,
        }
    }
}

/// A node in the conversation graph.
///
/// Buttons are eagerly loaded in their configured order; order determines
/// the on-screen layout and the first-listed match on lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: Uuid,
    /// Unique within a deployment; display/debugging only, never a routing key.
    pub title: String,
    /// Greeting sent when an account arrives at this menu; None sends a
    /// bare keyboard instead.
    pub message: Option<String>,
    /// Fallback handler for free-text messages while on this menu.
    pub handler: Option<String>,
    pub buttons: Vec<Button>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            message: None,
            handler: None,
            buttons: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Active buttons matching an inbound command or display text,
    /// in menu order.
    pub fn find_matches(&self, needle: &str) -> Vec<&Button> {
        self.buttons
            .iter()
            .filter(|b| b.is_active && b.matches(needle))
            .collect()
    }

    /// Active non-inline buttons, in layout order.
    pub fn button_list(&self) -> Vec<&Button> {
        self.buttons
            .iter()
            .filter(|b| b.is_active && !b.is_inline)
            .collect()
    }

    /// Active inline buttons, in layout order.
    pub fn inline_button_list(&self) -> Vec<&Button> {
        self.buttons
            .iter()
            .filter(|b| b.is_active && b.is_inline)
            .collect()
    }

    /// Keyboard projection of the non-inline button list.
    pub fn keyboard(&self) -> Vec<KeyboardButton> {
        self.button_list()
            .into_iter()
            .map(Button::keyboard_button)
            .collect()
    }
}

/// `btn-<slugified-title>-<random-suffix>`, unique and stable.
fn generate_command(title: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(10).collect();
    format!("btn-{}-{}", slugify(title), suffix)
}

/// Lowercase alphanumeric slug with single-dash separators.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Main Menu"), "main-menu");
        assert_eq!(slugify("  Orders & Returns  "), "orders-returns");
        assert_eq!(slugify("FAQ"), "faq");
    }

    #[test]
    fn test_command_generated_once_and_stable() {
        let mut button = Button::new("Orders", "My orders");
        assert!(button.command.starts_with("btn-orders-"));

        let original = button.command.clone();
        button.title = "Purchases".to_string();
        assert_eq!(button.command, original);
    }

    #[test]
    fn test_commands_are_unique_per_button() {
        let a = Button::new("Orders", "Orders");
        let b = Button::new("Orders", "Orders");
        assert_ne!(a.command, b.command);
    }

    #[test]
    fn test_matches_on_command_or_text() {
        let button = Button::new("Orders", "My orders");
        assert!(button.matches(&button.command));
        assert!(button.matches("My orders"));
        assert!(!button.matches("my orders"));
    }

    #[test]
    fn test_find_matches_skips_inactive_and_keeps_order() {
        let first = Button::new("A", "Same");
        let second = Button::new("B", "Same");
        let mut inactive = Button::new("C", "Same");
        inactive.is_active = false;

        let menu = Menu::new("Home").with_buttons(vec![
            first.clone(),
            inactive,
            second.clone(),
        ]);

        let found = menu.find_matches("Same");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, first.id);
        assert_eq!(found[1].id, second.id);
    }

    #[test]
    fn test_keyboard_excludes_inline_buttons() {
        let plain = Button::new("Plain", "Plain");
        let inline = Button::new("Inline", "Inline").inline();
        let menu = Menu::new("Home").with_buttons(vec![plain.clone(), inline]);

        let keyboard = menu.keyboard();
        assert_eq!(keyboard.len(), 1);
        assert_eq!(keyboard[0].text, "Plain");
        assert_eq!(keyboard[0].command, plain.command);
    }
}
