use serde::{Deserialize, Serialize};

/// Per-user profile and notification preferences. Upserted with merge
/// semantics — a partial patch never clears fields it does not mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub profile_visible: bool,
    pub email_notifications: bool,
    pub desired_titles: Vec<String>,
    pub industries: Vec<String>,
    pub remote_only: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            display_name: None,
            email: None,
            phone: None,
            location: None,
            profile_visible: true,
            email_notifications: true,
            desired_titles: Vec::new(),
            industries: Vec::new(),
            remote_only: false,
        }
    }
}

impl UserSettings {
    /// Renders the profile lines attached to assistant prompts. Only fields
    /// the user actually filled in are included.
    pub fn profile_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.display_name {
            lines.push(format!("Name: {name}"));
        }
        if let Some(email) = &self.email {
            lines.push(format!("Email: {email}"));
        }
        if let Some(phone) = &self.phone {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(location) = &self.location {
            lines.push(format!("Location: {location}"));
        }
        if !self.desired_titles.is_empty() {
            lines.push(format!("Desired roles: {}", self.desired_titles.join(", ")));
        }
        if !self.industries.is_empty() {
            lines.push(format!("Industries: {}", self.industries.join(", ")));
        }
        if self.remote_only {
            lines.push("Prefers remote-only roles".to_string());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_summary_skips_unset_fields() {
        let settings = UserSettings::default();
        assert_eq!(settings.profile_summary(), "");
    }

    #[test]
    fn test_profile_summary_lists_filled_fields() {
        let settings = UserSettings {
            display_name: Some("Ada".to_string()),
            location: Some("Berlin".to_string()),
            desired_titles: vec!["Engineer".to_string(), "Architect".to_string()],
            remote_only: true,
            ..UserSettings::default()
        };

        let summary = settings.profile_summary();
        assert!(summary.contains("Name: Ada"));
        assert!(summary.contains("Location: Berlin"));
        assert!(summary.contains("Desired roles: Engineer, Architect"));
        assert!(summary.contains("remote-only"));
        assert!(!summary.contains("Phone"));
    }

    #[test]
    fn test_partial_document_decodes_with_defaults() {
        let settings: UserSettings =
            serde_json::from_value(json!({ "displayName": "Ada" })).unwrap();
        assert_eq!(settings.display_name.as_deref(), Some("Ada"));
        assert!(settings.email_notifications);
        assert!(settings.desired_titles.is_empty());
    }
}
