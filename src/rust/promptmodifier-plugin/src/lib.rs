use std::sync::OnceLock;

use promptmodifier::{ModifierConfig, PromptModifier};
use tracing::warn;

use crate::exports::component::promptprocessor::promptmodification::Guest;
use crate::outbound::WasiHttpDispatcher;

mod outbound;

wit_bindgen::generate!({
    world: "promptmodifier",
    path: "wit",
});

/// Built on first use; `None` when the configuration is unusable
static MODIFIER: OnceLock<Option<PromptModifier<WasiHttpDispatcher>>> = OnceLock::new();

fn modifier() -> Option<&'static PromptModifier<WasiHttpDispatcher>> {
    MODIFIER
        .get_or_init(|| match load_modifier() {
            Ok(modifier) => Some(modifier),
            Err(e) => {
                warn!(error = %e, "promptmodifier disabled, prompts pass through untouched");
                None
            }
        })
        .as_ref()
}

fn load_modifier() -> anyhow::Result<PromptModifier<WasiHttpDispatcher>> {
    let config = ModifierConfig::from_env()?;
    Ok(PromptModifier::from_config(&config, WasiHttpDispatcher)?)
}

struct Component;

impl Guest for Component {
    fn before(userprompt: String) -> String {
        match modifier() {
            Some(modifier) => modifier.before(userprompt),
            None => userprompt,
        }
    }

    fn after(promptresult: String) -> String {
        promptmodifier::after(&promptresult)
    }
}

export!(Component);
