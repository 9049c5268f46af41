//! In-app assistant session: a per-process transcript around the shared
//! completion provider, fed with pinned-job and profile context.
//!
//! The transcript lives in memory only. Upstream failures never surface to
//! the user as errors; the session degrades to a canned reply and keeps
//! accepting messages.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::gateway::prompts::SYSTEM_PROMPT;
use crate::llm_client::CompletionProvider;
use crate::models::chat::{ChatMessage, ChatTurn};
use crate::models::settings::UserSettings;
use crate::models::user::UserIdentity;
use crate::prompt;
use crate::references::{ContextReferences, JobReference};

/// Served verbatim whenever the upstream call fails.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

pub struct Assistant {
    provider: Arc<dyn CompletionProvider>,
    references: Arc<ContextReferences>,
    transcript: Mutex<Vec<ChatMessage>>,
}

impl Assistant {
    pub fn new(provider: Arc<dyn CompletionProvider>, references: Arc<ContextReferences>) -> Self {
        Self {
            provider,
            references,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Sends one user message and returns the assistant's reply.
    ///
    /// The prompt carries the transcript so far (windowed during assembly),
    /// the current pinned-job list, and whatever profile data is on hand.
    /// Both the user message and the reply are appended to the transcript,
    /// fallback replies included.
    pub async fn chat(
        &self,
        message: &str,
        identity: Option<&UserIdentity>,
        settings: Option<&UserSettings>,
    ) -> ChatMessage {
        // snapshot before this message joins the transcript
        let history: Vec<ChatTurn> = {
            let transcript = self.transcript.lock().unwrap();
            transcript.iter().map(ChatTurn::from).collect()
        };

        let pinned = self.references.list();
        let job_context = format_job_context(&pinned);
        let profile = format_user_profile(identity, settings);
        let prompt = prompt::assemble(
            message,
            job_context.as_deref(),
            profile.as_deref(),
            &history,
        );

        let reply = match self.provider.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => completion.text,
            Err(err) => {
                warn!("completion failed, serving fallback reply: {err}");
                FALLBACK_REPLY.to_string()
            }
        };

        let response = ChatMessage::assistant(reply);
        let mut transcript = self.transcript.lock().unwrap();
        transcript.push(ChatMessage::user(message));
        transcript.push(response.clone());
        response
    }

    /// Snapshot of the session transcript, oldest first.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().unwrap().clone()
    }
}

/// Renders pinned jobs as a prompt block. Empty input yields no block.
pub fn format_job_context(references: &[JobReference]) -> Option<String> {
    if references.is_empty() {
        return None;
    }

    let mut lines = vec!["The user has pinned these jobs for discussion:".to_string()];
    for reference in references {
        let mut line = format!(
            "- {} at {} ({})",
            reference.title, reference.company, reference.location
        );
        if let Some(score) = reference.match_score {
            line.push_str(&format!(", match score {score:.0}%"));
        }
        if !reference.posted_label.is_empty() {
            line.push_str(&format!(", posted {}", reference.posted_label));
        }
        lines.push(line);
    }
    Some(lines.join("\n"))
}

/// Combines identity fields and saved settings into profile lines. The saved
/// settings document wins; identity only fills the name/email it left blank.
pub fn format_user_profile(
    identity: Option<&UserIdentity>,
    settings: Option<&UserSettings>,
) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(identity) = identity {
        if !settings.is_some_and(|s| s.display_name.is_some()) {
            if let Some(name) = &identity.display_name {
                lines.push(format!("Name: {name}"));
            }
        }
        if !settings.is_some_and(|s| s.email.is_some()) {
            if let Some(email) = &identity.email {
                lines.push(format!("Email: {email}"));
            }
        }
    }

    if let Some(settings) = settings {
        let summary = settings.profile_summary();
        if !summary.is_empty() {
            lines.push(summary);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{CannedProvider, FailingProvider};
    use crate::models::chat::Sender;
    use crate::models::job::Job;
    use crate::models::user::UserId;

    fn make_job(link: &str, title: &str, company: &str) -> Job {
        Job {
            link: link.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            posted_label: "2 days ago".to_string(),
            description: None,
            match_score: Some(87.0),
        }
    }

    fn make_references(dir: &tempfile::TempDir) -> Arc<ContextReferences> {
        Arc::new(ContextReferences::open(dir.path().join("references.json")))
    }

    #[tokio::test]
    async fn test_chat_returns_reply_and_grows_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            Arc::new(CannedProvider::new("You could highlight your Rust work.")),
            make_references(&dir),
        );

        let reply = assistant.chat("How should I angle my CV?", None, None).await;
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.content, "You could highlight your Rust work.");

        let transcript = assistant.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].sender, Sender::User);
        assert_eq!(transcript[0].content, "How should I angle my CV?");
        assert_eq!(transcript[1].id, reply.id);
    }

    #[tokio::test]
    async fn test_upstream_failure_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(Arc::new(FailingProvider), make_references(&dir));

        let reply = assistant.chat("hello?", None, None).await;
        assert_eq!(reply.content, FALLBACK_REPLY);
        assert_eq!(reply.sender, Sender::Assistant);

        // the failed exchange still lands in the transcript
        assert_eq!(assistant.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_pinned_jobs_reach_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let references = make_references(&dir);
        references.add_job(&make_job("https://jobs/1", "Platform Engineer", "Ferrous"));

        let provider = Arc::new(CannedProvider::new("ok"));
        let assistant = Assistant::new(provider.clone(), references);
        assistant
            .chat("tell me about my pinned roles", None, None)
            .await;

        let prompts = provider.prompts.lock().unwrap();
        let (system, prompt) = &prompts[0];
        assert_eq!(system, SYSTEM_PROMPT);
        assert!(prompt.contains("Platform Engineer at Ferrous (Remote)"));
        assert!(prompt.contains("match score 87%"));
    }

    #[tokio::test]
    async fn test_second_message_carries_first_exchange_as_history() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CannedProvider::new("noted"));
        let assistant = Assistant::new(provider.clone(), make_references(&dir));

        assistant.chat("first question", None, None).await;
        assistant.chat("second question", None, None).await;

        let prompts = provider.prompts.lock().unwrap();
        let (_, first) = &prompts[0];
        let (_, second) = &prompts[1];
        assert!(!first.contains("Recent conversation:"));
        assert!(second.contains("User asked: first question"));
        assert!(second.contains("I previously answered: noted"));
    }

    #[test]
    fn test_profile_prefers_saved_settings_over_identity() {
        let identity = UserIdentity {
            id: UserId::new("user-1"),
            display_name: Some("A. Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        let settings = UserSettings {
            display_name: Some("Ada".to_string()),
            ..UserSettings::default()
        };

        let profile = format_user_profile(Some(&identity), Some(&settings)).unwrap();
        assert!(profile.contains("Name: Ada"));
        assert!(!profile.contains("A. Lovelace"));
        // identity still fills the email the settings left blank
        assert!(profile.contains("Email: ada@example.com"));
    }

    #[test]
    fn test_empty_inputs_yield_no_blocks() {
        assert!(format_job_context(&[]).is_none());
        assert!(format_user_profile(None, None).is_none());
    }
}
