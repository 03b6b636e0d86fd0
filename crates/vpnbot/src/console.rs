//! Console Transport
//!
//! Drives the bot from a terminal, standing in for the messenger:
//!
//! ```text
//! > /start
//! Welcome to the CMC MSU bot for fast and secure VPN connection!
//!   [Get your config!] -> config
//!   [FAQ] -> faq
//! > tap faq
//! ```
//!
//! The last message shown is tracked so edits replace it, like inline
//! keyboards do in a real chat.

use crate::handler::{Action, Bot, ChatId, Event, UserId};
use crate::settings::ConsoleSettings;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use vpnbot_faq::Screen;

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// `/name`
    Command(String),
    /// `tap <data>`
    Tap(String),
    /// `quit` / `exit`
    Quit,
}

impl ConsoleInput {
    /// Parse a line; `None` for blank or unrecognized input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();

        if let Some(name) = line.strip_prefix('/') {
            // Telegram-style `/start@botname` suffixes are dropped
            let name = name.split(['@', ' ']).next().unwrap_or_default();
            return (!name.is_empty()).then(|| ConsoleInput::Command(name.to_string()));
        }

        match line.split_once(char::is_whitespace) {
            Some(("tap", data)) if !data.trim().is_empty() => {
                Some(ConsoleInput::Tap(data.trim().to_string()))
            }
            _ if matches!(line, "quit" | "exit") => Some(ConsoleInput::Quit),
            _ => None,
        }
    }
}

/// Console input errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("No message to tap on yet, try /start")]
    NoMessage,

    #[error("No button with data {0:?} on the current message")]
    NoSuchButton(String),
}

/// Console session state
pub struct Console {
    chat_id: ChatId,
    user_id: UserId,
    /// Message the user is looking at
    current: Option<Screen>,
    next_query: u64,
}

impl Console {
    pub fn new(settings: &ConsoleSettings) -> Self {
        Self {
            chat_id: settings.chat_id,
            user_id: settings.user_id,
            current: None,
            next_query: 1,
        }
    }

    /// Turn input into a bot event
    pub fn event_for(&mut self, input: ConsoleInput) -> Result<Option<Event>, ConsoleError> {
        match input {
            ConsoleInput::Command(name) => Ok(Some(Event::Command {
                chat_id: self.chat_id,
                user_id: self.user_id,
                name,
            })),
            ConsoleInput::Tap(data) => {
                let message = self.current.clone().ok_or(ConsoleError::NoMessage)?;
                if message.keyboard.find(&data).is_none() {
                    return Err(ConsoleError::NoSuchButton(data));
                }

                let query_id = self.next_query.to_string();
                self.next_query += 1;

                Ok(Some(Event::Callback {
                    query_id,
                    chat_id: self.chat_id,
                    user_id: self.user_id,
                    data,
                    message,
                }))
            }
            ConsoleInput::Quit => Ok(None),
        }
    }

    /// Apply an action and return what to print
    pub fn apply(&mut self, action: Action) -> String {
        match action {
            Action::SendMessage { screen, .. } => {
                let out = render_screen(&screen);
                self.current = Some(screen);
                out
            }
            Action::EditMessage { screen, .. } => {
                let out = format!("(edited)\n{}", render_screen(&screen));
                self.current = Some(screen);
                out
            }
            Action::AnswerCallback { text: Some(text), .. } => format!("! {text}"),
            Action::AnswerCallback { text: None, .. } => String::new(),
            Action::SendDocument { path, .. } => format!("[document] {}", path.display()),
        }
    }
}

/// Text rendering of a screen
pub fn render_screen(screen: &Screen) -> String {
    let mut out = screen.text.clone();
    for button in screen.keyboard.buttons() {
        let _ = write!(out, "\n  [{}] -> {}", button.text, button.callback_data);
    }
    out
}

/// Read stdin until EOF or `quit`, one event at a time
pub async fn run(bot: &mut Bot, settings: &ConsoleSettings) -> anyhow::Result<()> {
    let mut console = Console::new(settings);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Console transport ready (user {}), type /start", settings.user_id);

    while let Some(line) = lines.next_line().await? {
        let Some(input) = ConsoleInput::parse(&line) else {
            if !line.trim().is_empty() {
                println!("? commands: /start, tap <data>, quit");
            }
            continue;
        };

        let event = match console.event_for(input) {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                println!("? {e}");
                continue;
            }
        };

        for action in bot.handle(event).await {
            let out = console.apply(action);
            if !out.is_empty() {
                println!("{out}");
            }
        }
    }

    Ok(())
}
