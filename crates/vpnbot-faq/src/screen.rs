//! Screens and Inline Keyboards
//!
//! A screen is what one bot message shows: text, its markup format and the
//! buttons under it. Screens are plain values so they can be snapshotted
//! and restored byte for byte.

use serde::{Deserialize, Serialize};

/// Characters that must be escaped in Telegram MarkdownV2
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape text for MarkdownV2
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape and wrap in bold markers
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

/// How the message text is interpreted by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextFormat {
    #[default]
    Plain,
    MarkdownV2,
}

/// Inline button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Label
    pub text: String,
    /// Data sent back when pressed
    pub callback_data: String,
}

impl Button {
    /// Create a callback button
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard (rows of buttons)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<Button>>,
}

impl InlineKeyboard {
    /// Empty keyboard
    pub fn new() -> Self {
        Self::default()
    }

    /// One button per row
    pub fn single_column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Append a row holding one button
    pub fn push(&mut self, button: Button) {
        self.rows.push(vec![button]);
    }

    /// All buttons, row by row
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Find the button carrying `data`
    pub fn find(&self, data: &str) -> Option<&Button> {
        self.buttons().find(|b| b.callback_data == data)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }
}

/// What a message displays
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Screen {
    pub text: String,
    pub format: TextFormat,
    pub keyboard: InlineKeyboard,
}

impl Screen {
    /// Plain-text screen
    pub fn plain(text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            keyboard,
        }
    }

    /// MarkdownV2 screen (text must already be escaped)
    pub fn markdown(text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::MarkdownV2,
            keyboard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("v1.2 (beta)!"), "v1\\.2 \\(beta\\)\\!");
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(bold("Why?"), "*Why?*");
        assert_eq!(bold("Is it free?"), "*Is it free?*");
    }

    #[test]
    fn test_single_column() {
        let kb = InlineKeyboard::single_column([Button::new("A", "a"), Button::new("B", "b")]);

        assert_eq!(kb.rows.len(), 2);
        assert_eq!(kb.find("b").map(|b| b.text.as_str()), Some("B"));
        assert!(kb.find("c").is_none());
        assert!(!kb.is_empty());
        assert!(InlineKeyboard::new().is_empty());
    }
}
