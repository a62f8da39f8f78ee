pub mod auth;
pub mod chat;
pub mod event_bus;
pub mod memory_store;
pub mod pg_store;
pub mod store;

pub use auth::{AdminGrant, AdminIdentity, AuthError, Authenticator, PasswordAuthenticator};
pub use chat::ChatService;
pub use event_bus::{ChangeEvent, EventBus, EventFilter, Notification, Subscription};
pub use memory_store::{InjectedFailure, MemoryChatStore};
pub use pg_store::PgChatStore;
pub use store::{ChatStore, ClaimOutcome, CloseOutcome};
