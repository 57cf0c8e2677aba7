use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat input bounds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caps on inbound conversation size. These bound token spend per
/// request: every history turn and the user message are truncated to
/// `max_message_chars`, and only the most recent `max_history_turns`
/// turns are forwarded to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "d_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "d_max_history_turns")]
    pub max_history_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: d_max_message_chars(),
            max_history_turns: d_max_history_turns(),
        }
    }
}

fn d_max_message_chars() -> usize {
    600
}

fn d_max_history_turns() -> usize {
    8
}
