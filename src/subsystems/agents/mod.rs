//! Agents subsystem: the Friday agent: tier routing, one main-model call per
//! turn, and dispatch of the model's answer through the tool registry.

pub mod dispatch;
pub mod prompt;
pub mod router;

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::subsystems::tools::ToolRegistry;
pub use router::Tier;

pub struct FridayAgent {
    standard: LlmProvider,
    powerful: LlmProvider,
    registry: ToolRegistry,
    system_prompt: String,
    prompts_dir: PathBuf,
}

impl FridayAgent {
    pub fn new(
        standard: LlmProvider,
        powerful: LlmProvider,
        registry: ToolRegistry,
        prompts_dir: impl Into<PathBuf>,
        assistant_name: &str,
    ) -> Self {
        let prompts_dir = prompts_dir.into();
        let system_prompt = prompt::system_prompt(&prompts_dir, assistant_name, &registry.specs());
        debug!(tools = registry.len(), prompt_len = system_prompt.len(), "agent ready");
        Self { standard, powerful, registry, system_prompt, prompts_dir }
    }

    /// Classify `query` with the standard model.
    pub async fn select_tier(&self, query: &str) -> Tier {
        router::select_tier(&self.standard, &self.prompts_dir, query).await
    }

    pub fn provider(&self, tier: Tier) -> &LlmProvider {
        match tier {
            Tier::Standard => &self.standard,
            Tier::Powerful => &self.powerful,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one main-model call and collapse the answer to a single string.
    /// Provider errors come back as an apology line, never as `Err`.
    pub async fn respond(&self, tier: Tier, agent_input: &str, history: Vec<ChatMessage>) -> String {
        let request = ChatRequest {
            system: Some(self.system_prompt.clone()),
            history,
            user: agent_input.to_string(),
            tools: self.registry.specs(),
        };
        let provider = self.provider(tier);
        match provider.complete(&request).await {
            Ok(response) => dispatch::dispatch(response, &self.registry).await,
            Err(e) => {
                warn!(model = provider.model(), error = %e, "main model call failed");
                format!("Sorry, I ran into a problem: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::llm::{ModelResponse, ToolCall};

    fn agent(standard: &ScriptedProvider, powerful: &ScriptedProvider) -> FridayAgent {
        let registry = ToolRegistry::new()
            .with_tool("Shout", "Upper-cases its input.", |i| async move { Ok(i.to_uppercase()) });
        FridayAgent::new(
            LlmProvider::Scripted(standard.clone()),
            LlmProvider::Scripted(powerful.clone()),
            registry,
            "/nonexistent/prompts",
            "Friday",
        )
    }

    #[tokio::test]
    async fn respond_uses_selected_tier_and_advertises_tools() {
        let standard = ScriptedProvider::default();
        let powerful = ScriptedProvider::new([Ok(ModelResponse::plain(" deep answer "))]);
        let a = agent(&standard, &powerful);

        assert_eq!(a.respond(Tier::Powerful, "why?", vec![]).await, "deep answer");
        assert!(standard.requests().is_empty());
        let seen = powerful.requests();
        assert_eq!(seen[0].user, "why?");
        assert_eq!(seen[0].tools[0].name, "Shout");
        assert!(seen[0].system.as_deref().unwrap_or("").contains("You are Friday"));
    }

    #[tokio::test]
    async fn respond_runs_tools() {
        let standard = ScriptedProvider::new([Ok(ModelResponse::ToolCalls(vec![
            ToolCall::with_input("Shout", "hey"),
        ]))]);
        let a = agent(&standard, &ScriptedProvider::default());
        assert_eq!(a.respond(Tier::Standard, "shout hey", vec![]).await, "Shout: HEY");
    }

    #[tokio::test]
    async fn provider_error_becomes_apology() {
        let standard = ScriptedProvider::new([Err("quota exceeded".to_string())]);
        let a = agent(&standard, &ScriptedProvider::default());
        let out = a.respond(Tier::Standard, "hi", vec![]).await;
        assert!(out.starts_with("Sorry, I ran into a problem: "), "{out}");
        assert!(out.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn router_failure_defaults_to_standard() {
        let a = agent(&ScriptedProvider::default(), &ScriptedProvider::default());
        assert_eq!(a.select_tier("explain in depth").await, Tier::Standard);
    }

    #[tokio::test]
    async fn router_reads_classifier_word() {
        let standard = ScriptedProvider::new([Ok(ModelResponse::plain("Powerful"))]);
        let a = agent(&standard, &ScriptedProvider::default());
        assert_eq!(a.select_tier("explain in depth").await, Tier::Powerful);
        assert!(standard.requests()[0].user.contains("explain in depth"));
        assert!(standard.requests()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn echo_backed_agent_stays_on_standard() {
        use crate::llm::providers::dummy::DummyProvider;
        let a = FridayAgent::new(
            LlmProvider::Dummy(DummyProvider),
            LlmProvider::Dummy(DummyProvider),
            ToolRegistry::new(),
            "config/prompts",
            "Friday",
        );
        assert_eq!(a.select_tier("tell me a joke").await, Tier::Standard);
        assert_eq!(
            a.select_tier("give me a powerful argument").await,
            Tier::Standard
        );
        let answer = a.respond(Tier::Standard, "tell me a joke", Vec::new()).await;
        assert_eq!(answer, "[echo] tell me a joke");
    }
}
