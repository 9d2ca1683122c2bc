//! Context windows: turning chat history into a bounded prompt.
//!
//! 1. **[`window`]**: [`ContextWindowBuilder`] fetches the history since a
//!    start instant (skipping the lookup when the start is today), keeps the
//!    newest messages within a word budget, and labels each line with a
//!    relative day number.
//!
//! 2. **[`prompt`]**: [`PromptTemplates`] frames the window: question,
//!    context, question again; or a one-line prompt when there is no history.

pub mod prompt;
pub mod window;

pub use prompt::PromptTemplates;
pub use window::{
    ContextWindow, ContextWindowBuilder, DEFAULT_MAX_CONTEXT_WORDS, DEFAULT_MAX_HISTORY_DEPTH,
    same_calendar_day,
};
