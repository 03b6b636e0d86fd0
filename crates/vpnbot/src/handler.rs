//! Event Handler
//!
//! Transport-agnostic dispatch. The transport turns incoming updates into
//! [`Event`]s and executes the returned [`Action`]s; everything in between
//! lives here.

use crate::settings::BotTexts;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vpnbot_faq::{Button, FaqCallback, FaqNavigator, FaqStore, FaqTexts, InlineKeyboard, Screen};
use vpnbot_provision::{PeerConfigService, PeerId};

/// Callback data of the "get config" button
pub const CONFIG_DATA: &str = "config";

pub type ChatId = i64;
pub type UserId = i64;

/// Incoming update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/name` command
    Command {
        chat_id: ChatId,
        user_id: UserId,
        name: String,
    },
    /// Inline button press on `message`
    Callback {
        query_id: String,
        chat_id: ChatId,
        user_id: UserId,
        data: String,
        message: Screen,
    },
}

/// Outgoing transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendMessage { chat_id: ChatId, screen: Screen },
    /// Replace the message the callback came from
    EditMessage { chat_id: ChatId, screen: Screen },
    AnswerCallback { query_id: String, text: Option<String> },
    SendDocument { chat_id: ChatId, path: PathBuf },
}

/// Bot state shared by all chats
pub struct Bot {
    service: Arc<PeerConfigService>,
    faq_store: Arc<dyn FaqStore>,
    faq_texts: FaqTexts,
    texts: BotTexts,
    /// One FAQ history per chat
    navigators: HashMap<ChatId, FaqNavigator>,
}

impl Bot {
    pub fn new(
        service: Arc<PeerConfigService>,
        faq_store: Arc<dyn FaqStore>,
        faq_texts: FaqTexts,
        texts: BotTexts,
    ) -> Self {
        Self {
            service,
            faq_store,
            faq_texts,
            texts,
            navigators: HashMap::new(),
        }
    }

    /// Main menu
    pub fn welcome_screen(&self) -> Screen {
        Screen::plain(
            self.texts.welcome.clone(),
            InlineKeyboard::single_column([
                Button::new(self.texts.get_config_button.clone(), CONFIG_DATA),
                Button::new(self.texts.faq_button.clone(), FaqCallback::Open.data()),
            ]),
        )
    }

    /// Handle one event to completion
    pub async fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Command { chat_id, name, .. } => self.on_command(chat_id, &name),
            Event::Callback {
                query_id,
                chat_id,
                user_id,
                data,
                message,
            } => {
                if data == CONFIG_DATA {
                    self.on_config(query_id, chat_id, user_id).await
                } else if let Some(callback) = FaqCallback::parse(&data) {
                    self.on_faq(query_id, chat_id, callback, message)
                } else {
                    debug!("Ignoring unknown callback {:?}", data);
                    vec![Action::AnswerCallback { query_id, text: None }]
                }
            }
        }
    }

    fn on_command(&mut self, chat_id: ChatId, name: &str) -> Vec<Action> {
        match name {
            "start" | "help" => {
                // A fresh menu starts a fresh history
                self.navigators.remove(&chat_id);
                vec![Action::SendMessage {
                    chat_id,
                    screen: self.welcome_screen(),
                }]
            }
            _ => {
                debug!("Ignoring unknown command /{}", name);
                Vec::new()
            }
        }
    }

    async fn on_config(&mut self, query_id: String, chat_id: ChatId, user_id: UserId) -> Vec<Action> {
        let peer = PeerId::from_user(user_id);

        match self.service.get_or_create(&peer).await {
            Ok(provisioned) => {
                info!(
                    "Sending config of {} ({}, new: {})",
                    peer, provisioned.address, provisioned.created
                );
                vec![
                    Action::AnswerCallback {
                        query_id,
                        text: Some(self.texts.config_ready.clone()),
                    },
                    Action::SendDocument {
                        chat_id,
                        path: provisioned.path,
                    },
                ]
            }
            Err(e) => {
                error!("No config for {}: {}", peer, e);
                vec![Action::AnswerCallback {
                    query_id,
                    text: Some(self.texts.no_config.clone()),
                }]
            }
        }
    }

    fn on_faq(
        &mut self,
        query_id: String,
        chat_id: ChatId,
        callback: FaqCallback,
        message: Screen,
    ) -> Vec<Action> {
        let navigator = self
            .navigators
            .entry(chat_id)
            .or_insert_with(|| FaqNavigator::new(self.faq_store.clone(), self.faq_texts.clone()));

        let result = navigator.handle(callback, message);
        if navigator.depth() == 0 {
            // Back at the screen the FAQ was opened from
            self.navigators.remove(&chat_id);
        }

        match result {
            Ok(screen) => vec![
                Action::AnswerCallback { query_id, text: None },
                Action::EditMessage { chat_id, screen },
            ],
            Err(e) => {
                warn!("FAQ navigation failed in chat {}: {}", chat_id, e);
                vec![Action::AnswerCallback {
                    query_id,
                    text: Some(self.texts.menu_expired.clone()),
                }]
            }
        }
    }
}
