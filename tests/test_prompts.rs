//! Tests for prompt files under config/prompts and the default config.

use std::fs;
use std::path::Path;

use friday::subsystems::agents::prompt::{router_prompt, system_prompt};

#[test]
fn test_prompt_layers_exist() {
    for name in ["persona.md", "tools.md", "format.md", "router.md"] {
        let path = format!("config/prompts/{name}");
        assert!(fs::metadata(&path).is_ok(), "{name} prompt file missing");
    }
}

#[test]
fn test_persona_template_vars() {
    let text = fs::read_to_string("config/prompts/persona.md").unwrap();
    assert!(text.contains("{{name}}"), "persona.md should contain {{name}} variable");
}

#[test]
fn test_tools_template_vars() {
    let text = fs::read_to_string("config/prompts/tools.md").unwrap();
    assert!(text.contains("{{tools}}"), "tools.md should contain {{tools}} variable");
}

#[test]
fn test_router_template_vars() {
    let text = fs::read_to_string("config/prompts/router.md").unwrap();
    assert!(text.contains("{{query}}"), "router.md should contain {{query}} variable");
    assert!(text.contains("'standard' or 'powerful'"));
}

#[test]
fn test_system_prompt_has_no_leftover_placeholders() {
    let prompt = system_prompt(Path::new("config/prompts"), "Friday", &[]);
    assert!(prompt.starts_with("You are Friday"));
    assert!(!prompt.contains("{{"), "unsubstituted variable in: {prompt}");
}

#[test]
fn test_router_prompt_quotes_query() {
    let prompt = router_prompt(Path::new("config/prompts"), "tell me a joke");
    assert!(prompt.contains("User Query: \"tell me a joke\""));
}

#[test]
fn test_default_config_loads() {
    let cfg = friday::config::load_from(Path::new("config/default.toml"), Some("/tmp/friday-test"), None)
        .expect("config/default.toml should parse");
    assert_eq!(cfg.memory.collection, "friday_memory");
    assert_eq!(cfg.memory.retrieve_k, 3);
    assert_eq!(cfg.memory.vector_dir, Path::new("/tmp/friday-test/vector_db"));
    assert_eq!(cfg.voice.wake_word, "friday");
}
