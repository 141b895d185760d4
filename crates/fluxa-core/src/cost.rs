use serde::{Deserialize, Serialize};

pub const CHARS_PER_TOKEN: usize = 4;
pub const INPUT_COST_PER_1K: f64 = 0.005;
pub const OUTPUT_COST_PER_1K: f64 = 0.015;

/// Documents the agent is expected to read per run, and tokens per document.
pub const AGENT_DOC_READS: u64 = 5;
pub const AGENT_TOKENS_PER_DOC: u64 = 500;
pub const AGENT_OUTPUT_TOKENS: u64 = 2000;

/// Rough USD cost of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: String,
}

impl CostEstimate {
    fn from_tokens(input_tokens: u64, output_tokens: u64) -> Self {
        let input_cost = input_tokens as f64 / 1000.0 * INPUT_COST_PER_1K;
        let output_cost = output_tokens as f64 / 1000.0 * OUTPUT_COST_PER_1K;
        Self {
            input_tokens,
            output_tokens,
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            currency: "USD".to_string(),
        }
    }
}

/// Chat strategy: prompt plus content at four characters per token, output
/// budgeted at `output_tokens`.
pub fn estimate_cost(prompt_chars: usize, content_chars: usize, output_tokens: u64) -> CostEstimate {
    let input_tokens = ((prompt_chars + content_chars) / CHARS_PER_TOKEN) as u64;
    CostEstimate::from_tokens(input_tokens, output_tokens)
}

/// Agent strategy: adds the documentation the agent reads and a fixed
/// output budget.
pub fn estimate_agent_cost(prompt_chars: usize, content_chars: usize) -> CostEstimate {
    let input_tokens = (content_chars / CHARS_PER_TOKEN) as u64
        + (prompt_chars / CHARS_PER_TOKEN) as u64
        + AGENT_DOC_READS * AGENT_TOKENS_PER_DOC;
    CostEstimate::from_tokens(input_tokens, AGENT_OUTPUT_TOKENS)
}
