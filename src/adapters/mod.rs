pub mod telegram;
pub mod transport;

pub use telegram::{CallbackQuery, Chat, Message, TelegramTransport, Update, User};
pub use transport::{ReviewTransport, TransportError, TransportResult};
