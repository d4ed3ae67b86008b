pub mod block;
pub mod entry;
pub mod hook;
pub mod message;
pub mod tokens;

pub use block::Block;
pub use entry::{RecordKind, UsageRecord};
pub use hook::HookJson;
pub use message::TranscriptLine;
pub use tokens::{AccountingScope, BlockWindow, ConversationWindow, TokenCounts, Tokens};
