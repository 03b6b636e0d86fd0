//! FAQ Navigator
//!
//! Stack-based menu navigation. Every forward step pushes the screen that
//! was on display; "back" pops it. One navigator serves one chat.
//!
//! # Callback data
//!
//! | Data | Action |
//! |------|--------|
//! | `faq` | open the question list |
//! | `faq_question_{id}` | open one question |
//! | `faq_back` | restore the previous screen |

use crate::screen::{Button, InlineKeyboard, Screen, bold, escape_markdown};
use crate::store::FaqStore;
use std::sync::Arc;
use tracing::debug;

/// Callback data opening the FAQ list
pub const OPEN_DATA: &str = "faq";
/// Callback data of the back button
pub const BACK_DATA: &str = "faq_back";
/// Callback data prefix of question buttons
pub const QUESTION_PREFIX: &str = "faq_question_";

/// Navigation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaqError {
    #[error("No previous menu found")]
    NoPreviousScreen,

    #[error("FAQ question {0} not found")]
    QuestionNotFound(u64),
}

/// Decoded FAQ callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqCallback {
    Open,
    Question(u64),
    Back,
}

impl FaqCallback {
    /// Decode callback data; `None` if it is not an FAQ callback
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            OPEN_DATA => Some(FaqCallback::Open),
            BACK_DATA => Some(FaqCallback::Back),
            _ => data
                .strip_prefix(QUESTION_PREFIX)
                .and_then(|id| id.parse().ok())
                .map(FaqCallback::Question),
        }
    }

    /// Encode as callback data
    pub fn data(&self) -> String {
        match self {
            FaqCallback::Open => OPEN_DATA.to_string(),
            FaqCallback::Back => BACK_DATA.to_string(),
            FaqCallback::Question(id) => format!("{QUESTION_PREFIX}{id}"),
        }
    }
}

/// Labels used by the FAQ screens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqTexts {
    pub title: String,
    pub back_button: String,
}

impl Default for FaqTexts {
    fn default() -> Self {
        Self {
            title: "Frequently asked questions".to_string(),
            back_button: "«Back".to_string(),
        }
    }
}

/// FAQ Navigator
pub struct FaqNavigator {
    store: Arc<dyn FaqStore>,
    texts: FaqTexts,
    /// Screens to return to, most recent last
    stack: Vec<Screen>,
}

impl FaqNavigator {
    /// Create a navigator with an empty history
    pub fn new(store: Arc<dyn FaqStore>, texts: FaqTexts) -> Self {
        Self {
            store,
            texts,
            stack: Vec::new(),
        }
    }

    /// Number of screens "back" can restore
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Remember `current` and show the question list
    pub fn open_faq(&mut self, current: Screen) -> Result<Screen, FaqError> {
        self.stack.push(current);
        debug!("FAQ list opened (depth {})", self.stack.len());
        Ok(self.list_screen())
    }

    /// Remember `current` and show question `id`.
    ///
    /// An unknown id leaves the history untouched.
    pub fn open_question(&mut self, id: u64, current: Screen) -> Result<Screen, FaqError> {
        let entry = self.store.get_by_id(id).ok_or(FaqError::QuestionNotFound(id))?;

        self.stack.push(current);
        debug!("FAQ question {} opened (depth {})", id, self.stack.len());

        let text = format!("{}\n\n{}", bold(&entry.question), escape_markdown(&entry.answer));
        Ok(Screen::markdown(text, self.back_keyboard()))
    }

    /// Restore the previous screen
    pub fn go_back(&mut self) -> Result<Screen, FaqError> {
        let screen = self.stack.pop().ok_or(FaqError::NoPreviousScreen)?;
        debug!("FAQ back (depth {})", self.stack.len());
        Ok(screen)
    }

    /// Dispatch a decoded callback
    pub fn handle(&mut self, callback: FaqCallback, current: Screen) -> Result<Screen, FaqError> {
        match callback {
            FaqCallback::Open => self.open_faq(current),
            FaqCallback::Question(id) => self.open_question(id, current),
            FaqCallback::Back => self.go_back(),
        }
    }

    fn list_screen(&self) -> Screen {
        let mut keyboard = InlineKeyboard::single_column(
            self.store
                .select_all()
                .into_iter()
                .map(|e| Button::new(e.question, FaqCallback::Question(e.id).data())),
        );
        keyboard.push(self.back_button());
        Screen::plain(self.texts.title.clone(), keyboard)
    }

    fn back_keyboard(&self) -> InlineKeyboard {
        InlineKeyboard::single_column([self.back_button()])
    }

    fn back_button(&self) -> Button {
        Button::new(self.texts.back_button.clone(), BACK_DATA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::TextFormat;
    use crate::store::{FaqEntry, StaticFaqStore};

    fn navigator() -> FaqNavigator {
        let store = StaticFaqStore::new(vec![
            FaqEntry {
                id: 1,
                question: "How do I connect?".to_string(),
                answer: "Import the config.".to_string(),
            },
            FaqEntry {
                id: 2,
                question: "Is it free?".to_string(),
                answer: "Yes!".to_string(),
            },
        ])
        .unwrap();
        FaqNavigator::new(Arc::new(store), FaqTexts::default())
    }

    fn main_menu() -> Screen {
        Screen::plain(
            "Welcome",
            InlineKeyboard::single_column([
                Button::new("Get your config!", "config"),
                Button::new("FAQ", "faq"),
            ]),
        )
    }

    #[test]
    fn test_callback_parse() {
        assert_eq!(FaqCallback::parse("faq"), Some(FaqCallback::Open));
        assert_eq!(FaqCallback::parse("faq_back"), Some(FaqCallback::Back));
        assert_eq!(FaqCallback::parse("faq_question_12"), Some(FaqCallback::Question(12)));
        assert_eq!(FaqCallback::parse("faq_question_x"), None);
        assert_eq!(FaqCallback::parse("config"), None);
        assert_eq!(FaqCallback::Question(7).data(), "faq_question_7");
    }

    #[test]
    fn test_list_screen() {
        let mut nav = navigator();
        let list = nav.open_faq(main_menu()).unwrap();

        assert_eq!(list.text, "Frequently asked questions");
        let data: Vec<&str> = list.keyboard.buttons().map(|b| b.callback_data.as_str()).collect();
        assert_eq!(data, vec!["faq_question_1", "faq_question_2", "faq_back"]);
        assert_eq!(list.keyboard.find("faq_back").unwrap().text, "«Back");
    }

    #[test]
    fn test_back_restores_exact_screen() {
        let mut nav = navigator();
        let before = main_menu();

        nav.open_faq(before.clone()).unwrap();
        let restored = nav.go_back().unwrap();

        assert_eq!(restored, before);
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_question_screen() {
        let mut nav = navigator();
        let list = nav.open_faq(main_menu()).unwrap();
        let question = nav.open_question(2, list.clone()).unwrap();

        assert_eq!(question.format, TextFormat::MarkdownV2);
        assert_eq!(question.text, "*Is it free?*\n\nYes\\!");
        assert_eq!(question.keyboard.buttons().count(), 1);

        // Back twice walks the whole history
        assert_eq!(nav.go_back().unwrap(), list);
        assert_eq!(nav.go_back().unwrap(), main_menu());
    }

    #[test]
    fn test_unknown_question_keeps_stack() {
        let mut nav = navigator();
        let list = nav.open_faq(main_menu()).unwrap();

        let err = nav.open_question(99, list).unwrap_err();

        assert_eq!(err, FaqError::QuestionNotFound(99));
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.go_back().unwrap(), main_menu());
    }

    #[test]
    fn test_back_on_empty_stack() {
        let mut nav = navigator();
        assert_eq!(nav.go_back(), Err(FaqError::NoPreviousScreen));
        assert_eq!(nav.handle(FaqCallback::Back, main_menu()), Err(FaqError::NoPreviousScreen));
    }
}
