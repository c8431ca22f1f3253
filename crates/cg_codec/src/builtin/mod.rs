//! Built-in codecs.

pub mod system_rules;
pub mod tool_schema;
pub mod structured_reference;
pub mod conversation_history;
pub mod tool_output;
pub mod redacted_stub;
pub mod unsafe_text;
pub mod user_turn;

pub use conversation_history::ConversationHistory;
pub use redacted_stub::RedactedStub;
pub use structured_reference::StructuredReference;
pub use system_rules::SystemRules;
pub use tool_output::ToolOutput;
pub use tool_schema::ToolSchema;
pub use unsafe_text::UnsafeText;
pub use user_turn::UserTurn;

use crate::contract::Codec;

/// All built-ins, in registration order.
pub fn all() -> Vec<Box<dyn Codec>> {
    vec![
        Box::new(SystemRules),
        Box::new(ToolSchema),
        Box::new(StructuredReference),
        Box::new(ConversationHistory),
        Box::new(ToolOutput),
        Box::new(RedactedStub),
        Box::new(UnsafeText),
        Box::new(UserTurn),
    ]
}
