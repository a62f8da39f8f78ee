use std::sync::Arc;

use crate::{
    config::Config,
    services::{Authenticator, ChatService},
};

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub authenticator: Arc<dyn Authenticator>,
    pub config: Config,
}

impl AppState {
    pub fn new(chat: ChatService, authenticator: Arc<dyn Authenticator>, config: Config) -> Self {
        Self {
            chat,
            authenticator,
            config,
        }
    }
}
