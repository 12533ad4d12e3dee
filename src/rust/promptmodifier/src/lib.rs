// Library interface for promptmodifier
// The plugin component and the native harness both build on these modules

pub mod config;
pub mod dispatch;
pub mod hooks;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use config::{ConfigError, Endpoint, ModifierConfig, PartialModifierConfig};
pub use dispatch::{DispatchError, Dispatcher, OutboundPrompt, fire_and_forget};
pub use hooks::{AFTER_SUFFIX, PLAIN_TEXT, PromptModifier, after};

#[cfg(feature = "native")]
pub use dispatch::native::ReqwestDispatcher;
