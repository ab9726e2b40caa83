use crate::autofill::run_summary::{FieldDecision, FieldOutcome, RunSummary};
use crate::browser::session::BrowserSession;
use crate::cli::config::{AppConfig, KeyCommand, ProfileCommand, build_autofill, build_engine};
use crate::error::{AutofillError, StoreError};
use crate::field::field_model::{FormField, InputKind};
use crate::matching::engine::MatchResult;
use crate::page::FormPage;
use crate::page::memory_page::MemoryPage;
use crate::profile::profile_model::{Credential, ProfileEntry, StoredProfile, parse_entries};
use crate::profile::store::{CredentialStore, ProfileStore, Store};

// ============================================================================
// fill subcommand
// ============================================================================

/// Open `url`, fill its fields, and return the run summary.
pub fn cmd_fill(
    url: &str,
    threshold: Option<f64>,
    dry_run: bool,
    config: &AppConfig,
    store_path: &str,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let store = Store::open(store_path)?;
    let credential = store
        .get_credential()?
        .filter(Credential::is_usable)
        .ok_or(AutofillError::MissingCredential)?;
    let profile = store.get_profile()?.ok_or(AutofillError::MissingProfile)?;

    let engine = build_engine(&credential, config);
    let autofill = build_autofill(&config.autofill, threshold);

    eprintln!(
        "Filling {} with provider {} (threshold {:.2}){}",
        url,
        engine.provider_name(),
        autofill.threshold(),
        if dry_run { " [dry run]" } else { "" }
    );

    let mut session = BrowserSession::launch(&config.browser.script)?;
    session.navigate(url)?;

    let mut report = |outcome: &FieldOutcome| println!("{}", format_outcome(outcome));

    let summary = if dry_run {
        let mut snapshot = MemoryPage::from_raw(session.scan_raw()?);
        let fields = snapshot.scan_fields()?;
        autofill.run_autofill_observed(
            &fields,
            Some(&profile),
            Some(&credential),
            &engine,
            &mut snapshot,
            &mut report,
        )?
    } else {
        let fields = session.scan_fields()?;
        autofill.run_autofill_observed(
            &fields,
            Some(&profile),
            Some(&credential),
            &engine,
            &mut session,
            &mut report,
        )?
    };
    session.quit()?;

    println!("{}", summary);
    Ok(summary)
}

/// One progress line per field.
pub fn format_outcome(outcome: &FieldOutcome) -> String {
    let status = match &outcome.decision {
        FieldDecision::Accepted => "filled".to_string(),
        FieldDecision::Skipped(_) => format!("skipped ({})", outcome.decision.label()),
        FieldDecision::Errored(message) => format!("failed: {}", message),
    };
    format!(
        "  [{}] {}: {} (confidence {:.2})",
        outcome.index + 1,
        outcome.field,
        status,
        outcome.confidence
    )
}

// ============================================================================
// match subcommand
// ============================================================================

/// Field described on the command line. Only text-like types are accepted.
pub fn field_from_args(
    name: &str,
    input_type: &str,
    label: Option<&str>,
    placeholder: Option<&str>,
) -> Result<FormField, String> {
    let kind = InputKind::from_type_attr(input_type)
        .ok_or_else(|| format!("input type '{}' is never filled", input_type))?;
    let mut field = FormField::new(name, kind);
    if let Some(label) = label {
        field = field.with_label(label);
    }
    if let Some(placeholder) = placeholder {
        field = field.with_placeholder(placeholder);
    }
    Ok(field)
}

pub fn cmd_match(
    field: &FormField,
    config: &AppConfig,
    store_path: &str,
) -> Result<MatchResult, Box<dyn std::error::Error>> {
    let store = Store::open(store_path)?;
    let credential = store
        .get_credential()?
        .filter(Credential::is_usable)
        .ok_or(AutofillError::MissingCredential)?;
    let profile = store.get_profile()?.ok_or(AutofillError::MissingProfile)?;

    let engine = build_engine(&credential, config);
    let result = engine.match_field_with_profile(field, &profile);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result)
}

// ============================================================================
// profile subcommand
// ============================================================================

pub fn cmd_profile(
    action: &ProfileCommand,
    store: &mut Store,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProfileCommand::List => {
            let active = store.active_profile()?.map(|p| p.id);
            let profiles = store.list_profiles()?;
            if profiles.is_empty() {
                println!("No profiles stored");
            }
            for p in &profiles {
                let marker = if active.as_deref() == Some(p.id.as_str()) { "*" } else { " " };
                println!("{} {}  {} ({} entries)", marker, p.id, p.name, p.entries.len());
            }
        }
        ProfileCommand::Show { id } => {
            let profile = match id {
                Some(id) => store
                    .list_profiles()?
                    .into_iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| StoreError::ProfileNotFound(id.clone()))?,
                None => store.active_profile()?.ok_or(AutofillError::MissingProfile)?,
            };
            print_profile(&profile);
        }
        ProfileCommand::Add { name, entries } => {
            let entries = parse_entries(entries)?;
            let profile = store.add_profile(name, entries)?;
            println!("Added profile {} ({})", profile.id, profile.name);
        }
        ProfileCommand::Update {
            id,
            name,
            remove_keys,
            entries,
        } => {
            let mut profile = store
                .list_profiles()?
                .into_iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| StoreError::ProfileNotFound(id.clone()))?;
            if let Some(name) = name {
                profile.name = name.clone();
            }
            profile.entries.retain(|e| !remove_keys.contains(&e.key));
            merge_entries(&mut profile.entries, parse_entries(entries)?);
            let profile = store.update_profile(profile)?;
            println!("Updated profile {} ({})", profile.id, profile.name);
        }
        ProfileCommand::Remove { id } => {
            store.delete_profile(id)?;
            println!("Removed profile {}", id);
        }
        ProfileCommand::Use { id } => {
            store.set_active_profile(id)?;
            println!("Active profile: {}", id);
        }
    }
    Ok(())
}

/// Replace values of existing keys, append new keys in order.
pub fn merge_entries(existing: &mut Vec<ProfileEntry>, updates: Vec<ProfileEntry>) {
    for update in updates {
        match existing.iter_mut().find(|e| e.key == update.key) {
            Some(entry) => entry.value = update.value,
            None => existing.push(update),
        }
    }
}

fn print_profile(profile: &StoredProfile) {
    println!("{} ({})", profile.name, profile.id);
    for entry in &profile.entries {
        println!("  {} = {}", entry.key, entry.value);
    }
}

// ============================================================================
// key subcommand
// ============================================================================

pub fn cmd_key(action: &KeyCommand, store: &mut Store) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        KeyCommand::Set { provider, key } => {
            let credential = Credential::new(*provider, key);
            if !credential.is_usable() {
                return Err(format!("provider {} requires --key", provider).into());
            }
            store.set_credential(credential)?;
            println!("Stored key for {}", provider);
        }
        KeyCommand::Show => match store.get_credential()? {
            Some(c) => println!("{}: {}", c.provider, c.masked_key()),
            None => println!("No API key configured"),
        },
        KeyCommand::Clear => {
            store.clear_credential()?;
            println!("API key removed");
        }
    }
    Ok(())
}
