use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================================================
// Profile: the flat mapping the matching engine consumes
// ============================================================================

/// Semantic key (e.g. "氏名", "email") to value.
///
/// Ordered so that prompts built from the same profile are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(BTreeMap<String, String>);

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Profile {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Profile(iter.into_iter().collect())
    }
}

// ============================================================================
// Stored profiles: named records kept by the profile store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub key: String,
    pub value: String,
}

/// A named profile as persisted. Several may exist; one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub id: String,
    pub name: String,
    pub entries: Vec<ProfileEntry>,
    pub created_at_ms: u128,
    pub updated_at_ms: u128,
}

impl StoredProfile {
    pub fn new(id: &str, name: &str, entries: Vec<ProfileEntry>) -> Self {
        let now = now_ms();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            entries,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    /// Flatten into the matching profile. Later entries win on duplicate
    /// keys; entries with a blank key are ignored.
    pub fn to_profile(&self) -> Profile {
        self.entries
            .iter()
            .filter(|e| !e.key.trim().is_empty())
            .map(|e| (e.key.trim().to_string(), e.value.clone()))
            .collect()
    }
}

/// Parse `KEY=VALUE` pairs (as given on the command line).
pub fn parse_entries(pairs: &[String]) -> Result<Vec<ProfileEntry>, String> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(ProfileEntry {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got '{}'", pair)),
        })
        .collect()
}

pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

// ============================================================================
// Credential
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    Ollama,
    Mock,
}

impl ProviderKind {
    /// Local backends run without an API key.
    pub fn requires_key(&self) -> bool {
        matches!(self, ProviderKind::OpenAi | ProviderKind::Anthropic)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// API key plus the provider it belongs to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub key: String,
    pub provider: ProviderKind,
}

impl Credential {
    pub fn new(provider: ProviderKind, key: &str) -> Self {
        Self {
            key: key.to_string(),
            provider,
        }
    }

    /// A credential is usable when its provider needs no key or the key is set.
    pub fn is_usable(&self) -> bool {
        !self.provider.requires_key() || !self.key.trim().is_empty()
    }

    /// Key with all but the last four characters hidden.
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.key.chars().collect();
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &self.masked_key())
            .field("provider", &self.provider)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_profile_skips_blank_keys_and_last_wins() {
        let stored = StoredProfile::new(
            "profile-1",
            "home",
            vec![
                ProfileEntry { key: "email".into(), value: "a@example.com".into() },
                ProfileEntry { key: " ".into(), value: "ignored".into() },
                ProfileEntry { key: "email".into(), value: "b@example.com".into() },
            ],
        );
        let profile = stored.to_profile();
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.get("email"), Some("b@example.com"));
    }

    #[test]
    fn parse_entries_splits_on_first_equals() {
        let entries = parse_entries(&["url=https://x.test/?a=b".to_string()]).unwrap();
        assert_eq!(entries[0].key, "url");
        assert_eq!(entries[0].value, "https://x.test/?a=b");
        assert!(parse_entries(&["novalue".to_string()]).is_err());
        assert!(parse_entries(&["=v".to_string()]).is_err());
    }

    #[test]
    fn claude_is_an_alias_for_anthropic() {
        let kind: ProviderKind = serde_json::from_str("\"claude\"").unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
    }

    #[test]
    fn masked_key_hides_prefix() {
        let cred = Credential::new(ProviderKind::OpenAi, "sk-abcdef1234");
        assert_eq!(cred.masked_key(), "*********1234");
        assert!(!format!("{:?}", cred).contains("abcdef"));
    }

    #[test]
    fn ollama_credential_is_usable_without_key() {
        assert!(Credential::new(ProviderKind::Ollama, "").is_usable());
        assert!(!Credential::new(ProviderKind::OpenAi, "  ").is_usable());
    }
}
