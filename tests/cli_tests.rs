use clap::Parser;
use form_autofill::cli::commands::{
    cmd_key, cmd_match, cmd_profile, field_from_args, format_outcome, merge_entries,
};
use form_autofill::cli::config::{
    AppConfig, Cli, Commands, KeyCommand, ProfileCommand, build_autofill, load_config,
    resolve_store_path, retry_policy,
};
use form_autofill::autofill::run_summary::{FieldDecision, FieldOutcome, SkipReason};
use form_autofill::error::AutofillError;
use form_autofill::field::field_model::{FormField, InputKind};
use form_autofill::profile::profile_model::{Credential, ProfileEntry, ProviderKind};
use form_autofill::profile::store::{CredentialStore, ProfileStore, Store};

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_fill_minimal() {
    let cli = Cli::parse_from(["form-autofill", "fill", "--url", "https://example.com/contact"]);
    match cli.command {
        Commands::Fill { url, threshold, dry_run } => {
            assert_eq!(url, "https://example.com/contact");
            assert_eq!(threshold, None);
            assert!(!dry_run);
        }
        _ => panic!("Expected Fill command"),
    }
    assert_eq!(cli.verbose, 0);
}

#[test]
fn cli_parse_fill_all_args() {
    let cli = Cli::parse_from([
        "form-autofill",
        "-vv",
        "fill",
        "--url",
        "https://example.com",
        "--threshold",
        "0.85",
        "--dry-run",
        "--store",
        "/tmp/store.json",
    ]);
    match cli.command {
        Commands::Fill { threshold, dry_run, .. } => {
            assert_eq!(threshold, Some(0.85));
            assert!(dry_run);
        }
        _ => panic!("Expected Fill command"),
    }
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.store.as_deref(), Some("/tmp/store.json"));
}

#[test]
fn cli_parse_match_defaults_type_to_text() {
    let cli = Cli::parse_from(["form-autofill", "match", "--name", "fullName", "--label", "氏名"]);
    match cli.command {
        Commands::Match { name, input_type, label, placeholder } => {
            assert_eq!(name, "fullName");
            assert_eq!(input_type, "text");
            assert_eq!(label.as_deref(), Some("氏名"));
            assert_eq!(placeholder, None);
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn cli_parse_profile_update() {
    let cli = Cli::parse_from([
        "form-autofill",
        "profile",
        "update",
        "profile-1",
        "--name",
        "Work",
        "--remove-key",
        "phone",
        "email=taro@example.jp",
    ]);
    match cli.command {
        Commands::Profile {
            action: ProfileCommand::Update { id, name, remove_keys, entries },
        } => {
            assert_eq!(id, "profile-1");
            assert_eq!(name.as_deref(), Some("Work"));
            assert_eq!(remove_keys, vec!["phone"]);
            assert_eq!(entries, vec!["email=taro@example.jp"]);
        }
        _ => panic!("Expected Profile Update command"),
    }
}

#[test]
fn cli_parse_key_set_accepts_claude_alias() {
    let cli = Cli::parse_from(["form-autofill", "key", "set", "--provider", "claude", "--key", "sk-ant"]);
    match cli.command {
        Commands::Key { action: KeyCommand::Set { provider, key } } => {
            assert_eq!(provider, ProviderKind::Anthropic);
            assert_eq!(key, "sk-ant");
        }
        _ => panic!("Expected Key Set command"),
    }
}

#[test]
fn cli_rejects_threshold_outside_unit_range() {
    for raw in ["NaN", "inf", "1.5", "-0.1", "high"] {
        let result = Cli::try_parse_from(["form-autofill", "fill", "--url", "http://x", "--threshold", raw]);
        assert!(result.is_err(), "accepted --threshold {raw}");
    }
    let cli = Cli::parse_from(["form-autofill", "fill", "--url", "http://x", "--threshold", "1"]);
    assert!(matches!(cli.command, Commands::Fill { threshold: Some(t), .. } if t == 1.0));
}

#[test]
fn cli_rejects_unknown_provider() {
    let result = Cli::try_parse_from(["form-autofill", "key", "set", "--provider", "gemini"]);
    assert!(result.is_err());
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn load_config_missing_file_returns_defaults() {
    let config = load_config(Some("/nonexistent/form-autofill.yaml"));
    assert_eq!(config.autofill.threshold, 0.7);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.provider.timeout_secs, 30);
    assert_eq!(config.store.path, "form-autofill-store.json");
    assert_eq!(config.browser.script, "node/autofill_server.js");
}

#[test]
fn load_config_partial_yaml_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-autofill.yaml");
    std::fs::write(
        &path,
        "autofill:\n  threshold: 0.9\nprovider:\n  model: gpt-4o-mini\n  endpoint: http://localhost:9999/v1/chat/completions\n",
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.autofill.threshold, 0.9);
    assert_eq!(config.provider.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(config.provider.max_tokens, 256);
    assert_eq!(config.retry.base_delay_ms, 1000);
}

#[test]
fn load_config_malformed_yaml_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-autofill.yaml");
    std::fs::write(&path, "autofill: [unclosed").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.autofill.threshold, 0.7);
}

#[test]
fn threshold_flag_overrides_config() {
    let config = AppConfig::default();
    assert_eq!(build_autofill(&config.autofill, Some(0.5)).threshold(), 0.5);
    assert_eq!(build_autofill(&config.autofill, None).threshold(), 0.7);
}

#[test]
fn retry_config_is_clamped() {
    let mut config = AppConfig::default();
    config.retry.max_attempts = 10;
    assert_eq!(retry_policy(&config.retry).max_attempts(), 3);
}

#[test]
fn store_path_flag_overrides_config() {
    let config = AppConfig::default();
    assert_eq!(resolve_store_path(Some("/tmp/a.json"), &config), "/tmp/a.json");
    assert_eq!(resolve_store_path(None, &config), "form-autofill-store.json");
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn match_with_mock_provider_uses_active_profile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let path_str = path.to_str().unwrap();

    let mut store = Store::open(path_str).unwrap();
    cmd_key(&KeyCommand::Set { provider: ProviderKind::Mock, key: String::new() }, &mut store).unwrap();
    cmd_profile(
        &ProfileCommand::Add {
            name: "Home".into(),
            entries: vec!["email=taro@example.jp".into(), "name=山田太郎".into()],
        },
        &mut store,
    )
    .unwrap();

    let field = FormField::new("email", InputKind::Email).with_label("Email");
    let result = cmd_match(&field, &AppConfig::default(), path_str).unwrap();

    assert_eq!(result.value.as_deref(), Some("taro@example.jp"));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn match_without_key_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let path_str = path.to_str().unwrap();

    let err = cmd_match(&FormField::new("email", InputKind::Email), &AppConfig::default(), path_str)
        .unwrap_err();
    let autofill_err = err.downcast_ref::<AutofillError>().unwrap();
    assert!(matches!(autofill_err, AutofillError::MissingCredential));
}

#[test]
fn match_without_profile_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let path_str = path.to_str().unwrap();
    let mut store = Store::open(path_str).unwrap();
    store.set_credential(Credential::new(ProviderKind::OpenAi, "sk-test")).unwrap();

    let err = cmd_match(&FormField::new("email", InputKind::Email), &AppConfig::default(), path_str)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AutofillError>(),
        Some(AutofillError::MissingProfile)
    ));
}

#[test]
fn match_field_rejects_excluded_types() {
    for input_type in ["submit", "hidden", "checkbox", "button"] {
        assert!(field_from_args("go", input_type, None, None).is_err(), "{input_type}");
    }
}

#[test]
fn match_field_normalizes_type_and_keeps_descriptions() {
    let field = field_from_args("mail", "EMAIL", Some("Email"), Some("you@example.com")).unwrap();
    assert_eq!(field.input_type, "email");
    assert_eq!(field.label.as_deref(), Some("Email"));
    assert_eq!(field.placeholder.as_deref(), Some("you@example.com"));
}

#[test]
fn key_set_requires_key_for_remote_provider() {
    let mut store = Store::in_memory();
    let result = cmd_key(&KeyCommand::Set { provider: ProviderKind::OpenAi, key: "  ".into() }, &mut store);
    assert!(result.is_err());
    assert!(store.get_credential().unwrap().is_none());
}

#[test]
fn profile_update_merges_and_removes_keys() {
    let mut store = Store::in_memory();
    cmd_profile(
        &ProfileCommand::Add {
            name: "Home".into(),
            entries: vec!["name=山田太郎".into(), "phone=090-0000-0000".into()],
        },
        &mut store,
    )
    .unwrap();
    let id = store.list_profiles().unwrap()[0].id.clone();

    cmd_profile(
        &ProfileCommand::Update {
            id: id.clone(),
            name: None,
            remove_keys: vec!["phone".into()],
            entries: vec!["name=Taro Yamada".into(), "email=taro@example.jp".into()],
        },
        &mut store,
    )
    .unwrap();

    let profile = store.get_profile().unwrap().unwrap();
    assert_eq!(profile.get("name"), Some("Taro Yamada"));
    assert_eq!(profile.get("email"), Some("taro@example.jp"));
    assert_eq!(profile.get("phone"), None);
}

#[test]
fn profile_add_rejects_malformed_pair() {
    let mut store = Store::in_memory();
    let result = cmd_profile(
        &ProfileCommand::Add { name: "Bad".into(), entries: vec!["no-equals-sign".into()] },
        &mut store,
    );
    assert!(result.is_err());
    assert!(store.list_profiles().unwrap().is_empty());
}

#[test]
fn profile_remove_unknown_id_fails() {
    let mut store = Store::in_memory();
    let result = cmd_profile(&ProfileCommand::Remove { id: "profile-42".into() }, &mut store);
    assert!(result.is_err());
}

#[test]
fn merge_entries_replaces_in_place_and_appends() {
    let entry = |k: &str, v: &str| ProfileEntry { key: k.into(), value: v.into() };
    let mut existing = vec![entry("name", "A"), entry("city", "Tokyo")];
    merge_entries(&mut existing, vec![entry("name", "B"), entry("zip", "100-0001")]);
    assert_eq!(
        existing,
        vec![entry("name", "B"), entry("city", "Tokyo"), entry("zip", "100-0001")]
    );
}

#[test]
fn format_outcome_shows_position_and_decision() {
    let outcome = FieldOutcome {
        index: 0,
        field: "fullName".into(),
        decision: FieldDecision::Skipped(SkipReason::BelowThreshold),
        confidence: 0.4,
        attempts: 1,
    };
    let line = format_outcome(&outcome);
    assert!(line.contains("[1] fullName"));
    assert!(line.contains("skipped_below_threshold"));
    assert!(line.contains("0.40"));
}
