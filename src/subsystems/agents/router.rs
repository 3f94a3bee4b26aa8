//! Model-tier router: one cheap classification call decides whether a query
//! goes to the standard or the powerful model.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use super::prompt::router_prompt;
use crate::llm::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Standard,
    Powerful,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Powerful => "powerful",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Powerful` iff the classifier output mentions "powerful", in any case.
pub fn parse_tier(output: &str) -> Tier {
    if output.to_lowercase().contains("powerful") {
        Tier::Powerful
    } else {
        Tier::Standard
    }
}

/// Ask `provider` to classify `query`. Provider failures route to `Standard`.
/// The echo provider cannot classify, so it always routes to `Standard`.
pub async fn select_tier(provider: &LlmProvider, prompts_dir: &Path, query: &str) -> Tier {
    if matches!(provider, LlmProvider::Dummy(_)) {
        return Tier::Standard;
    }
    let prompt = router_prompt(prompts_dir, query);
    match provider.complete_text(&prompt).await {
        Ok(output) => {
            let tier = parse_tier(&output);
            debug!(%tier, decision = %output.trim(), "tier selected");
            tier
        }
        Err(e) => {
            warn!(error = %e, "tier router failed; using standard model");
            Tier::Standard
        }
    }
}
