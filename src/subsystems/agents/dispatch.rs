//! Response dispatcher: turns one [`ModelResponse`] into the single string
//! the user sees, running any requested tools along the way.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{ModelResponse, render_raw};
use crate::subsystems::tools::ToolRegistry;

/// Collapse a model response into one output string.
///
/// Tool calls run in the order the model listed them. Unknown tool names are
/// skipped without an output line; a failing tool produces an error line and
/// never stops the calls after it.
pub async fn dispatch(response: ModelResponse, registry: &ToolRegistry) -> String {
    match response {
        ModelResponse::Text(text) => text.render(),
        ModelResponse::Raw(value) => render_raw(&value),
        ModelResponse::ToolCalls(calls) => {
            let mut lines = Vec::with_capacity(calls.len());
            for call in calls {
                let Some(tool) = registry.get(&call.name) else {
                    warn!(tool = %call.name, "model requested unknown tool; skipped");
                    continue;
                };
                let input = first_argument(&call.arguments);
                debug!(tool = %call.name, %input, "invoking tool");

                // Spawned so a panicking tool is reported like any other failure.
                let line = match tokio::spawn(tool(input)).await {
                    Ok(Ok(result)) => format!("{}: {result}", call.name),
                    Ok(Err(e)) => {
                        warn!(tool = %call.name, error = %e, "tool failed");
                        format!("{} error: {e}", call.name)
                    }
                    Err(join) => {
                        warn!(tool = %call.name, error = %join, "tool task aborted");
                        format!("{} error: tool panicked", call.name)
                    }
                };
                lines.push(line);
            }
            lines.join("\n")
        }
    }
}

/// The value forwarded to a tool: the first declared argument only.
pub fn first_argument(arguments: &Map<String, Value>) -> String {
    match arguments.values().next() {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
