use crate::domain::explanation::StructuredExplanation;
use anyhow::Context;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefinementPrompt {
    pub system: String,
    pub user: String,
}

impl RefinementPrompt {
    pub fn from_structured(structured: &StructuredExplanation) -> anyhow::Result<Self> {
        let facts = serde_json::to_string_pretty(structured)
            .context("failed to serialize structured explanation for prompt")?;

        let user = format!(
            "Rewrite the draft explanation of {ticker}'s move on {date} for a retail investor.\n\n\
Structured facts (JSON):\n{facts}\n\n\
Draft explanation:\n{draft}\n\n\
Return only the rewritten explanation text.",
            ticker = structured.ticker,
            date = structured.date,
            draft = structured.explanation,
        );

        Ok(Self {
            system: system_prompt(),
            user,
        })
    }
}

fn system_prompt() -> String {
    [
        "You explain daily stock price moves to retail investors.",
        "Use only the facts in the structured JSON. Do not invent numbers, sources, or events.",
        "If no market data is present, say so plainly and do not speculate about a move.",
        "State uncertainty when confidence is below 0.8.",
        "Do not give investment advice or price targets.",
        "Answer in plain prose, at most 3 sentences, no markdown.",
    ]
    .join("\n")
}
