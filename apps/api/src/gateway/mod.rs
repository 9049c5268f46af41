// Assistant gateway: the HTTP surface that turns user text into LLM prompts.
// Implements: chat, job analysis, resume feedback, interview prep.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod handlers;
pub mod prompts;
