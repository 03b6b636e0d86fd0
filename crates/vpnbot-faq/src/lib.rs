//! vpnbot FAQ - Inline Menu Navigation
//!
//! Screens, inline keyboards and the FAQ navigator. The navigator keeps
//! an undo stack of screens so "back" always restores exactly what was
//! shown before, at any depth.

mod navigator;
mod screen;
mod store;

pub use navigator::{FaqCallback, FaqError, FaqNavigator, FaqTexts};
pub use screen::{Button, InlineKeyboard, Screen, TextFormat, bold, escape_markdown};
pub use store::{FaqEntry, FaqStore, StaticFaqStore, StoreError};
