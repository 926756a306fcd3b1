pub mod control;
pub mod hotwords;
pub mod reply;

pub use control::{ControlUpdate, Mode, ParseOutcome, parse_control};
pub use hotwords::HotwordsSpec;
pub use reply::{ReplyMode, ServerReply};
