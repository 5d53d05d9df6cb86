//! System prompt building for specialist agents

use tracing::debug;

use crate::types::ChatTurn;

/// Maximum conversation turns folded into the system prompt
const MAX_HISTORY_TURNS: usize = 20;

/// Build a specialist's system prompt from its instructions and the
/// session's recent conversation history.
pub fn build_system_prompt(instructions: &str, history: &[ChatTurn]) -> String {
    let mut prompt = String::new();

    prompt.push_str("# ROLE\n\n");
    prompt.push_str(instructions);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        prompt.push_str("# CONVERSATION SO FAR\n\n");
        let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
        for turn in history.iter().skip(skip) {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push_str(
            "\nUse this history to resolve references like \"there\" or \"my trip\" and to \
             fill in details (destination, dates, guest count) the user mentioned earlier.\n\n",
        );
    }

    prompt.push_str("# CURRENT TIME\n\n");
    prompt.push_str(&chrono::Utc::now().to_rfc3339());
    prompt.push_str("\n\n");

    prompt.push_str("# INSTRUCTIONS\n\n");
    prompt.push_str(
        "Always prefer invoking a relevant tool over answering from memory. \
         Summarize tool results clearly and concisely for the traveler.\n",
    );

    debug!("Built system prompt ({} chars)", prompt.len());

    prompt
}
