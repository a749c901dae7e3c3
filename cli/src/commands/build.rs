// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! Interactive agent builder
//!
//! Walks the builder sections with terminal prompts. Menu actions are routed
//! through the wizard's keyboard contract, so "next" is the same Ctrl+→ the
//! web builder handles and "jump" opens the Ctrl+K command palette.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use std::path::{Path, PathBuf};
use tracing::debug;

use phantom_core::domain::draft::{AgentDraft, AgentType, PersonalityTrait, Visibility};
use phantom_core::application::agent_settings::AgentSettingsService;
use phantom_core::domain::section::{DATA_SOURCES, IDENTITY, RULES};
use phantom_core::domain::wizard::{Key, KeyChord, KeyDisposition, Wizard, WizardShortcut};

use crate::commands::agent;
use crate::services::BuilderServices;

#[derive(Args)]
pub struct BuildCommand {
    /// Resume from a saved draft
    #[arg(long, value_name = "FILE")]
    draft: Option<PathBuf>,

    /// Where "save" writes the draft
    #[arg(short, long, default_value = "./agent-draft.yaml")]
    output: PathBuf,

    /// Register through the relay with a wallet signature
    #[arg(long)]
    signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Next,
    Previous,
    Jump,
    Save,
    Register,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 6] = [
        MenuAction::Next,
        MenuAction::Previous,
        MenuAction::Jump,
        MenuAction::Save,
        MenuAction::Register,
        MenuAction::Quit,
    ];

    fn label(&self) -> &'static str {
        match self {
            MenuAction::Next => "Next section (Ctrl+→)",
            MenuAction::Previous => "Previous section (Ctrl+←)",
            MenuAction::Jump => "Jump to section (Ctrl+K)",
            MenuAction::Save => "Save draft (Ctrl+S)",
            MenuAction::Register => "Register agent",
            MenuAction::Quit => "Quit",
        }
    }

    /// Chord the action stands for, if it is a wizard shortcut.
    fn chord(&self) -> Option<KeyChord> {
        match self {
            MenuAction::Next => Some(KeyChord::command(Key::ArrowRight)),
            MenuAction::Previous => Some(KeyChord::command(Key::ArrowLeft)),
            MenuAction::Jump => Some(KeyChord::command(Key::Char('k'))),
            MenuAction::Save => Some(KeyChord::command(Key::Char('s'))),
            MenuAction::Register | MenuAction::Quit => None,
        }
    }
}

pub async fn handle_command(command: BuildCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = BuilderServices::load(config_path)?;

    let mut draft = match &command.draft {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read draft: {:?}", path))?;
            serde_yaml::from_str(&content).context("Failed to parse draft YAML")?
        }
        None => AgentDraft::default(),
    };
    let settings = services.agent_settings();
    let mut wizard = Wizard::default();
    if draft.is_identity_complete() {
        wizard.mark_section_complete(IDENTITY);
    }
    sync_completion(&mut wizard, &settings, &draft).await?;

    let mut entered = true;
    loop {
        if entered {
            print_header(&wizard);
            edit_section(&mut wizard, &mut draft, &settings).await?;
        }

        let before = wizard.active_index();
        let action = prompt_action()?;
        if let Some(chord) = action.chord() {
            if let KeyDisposition::Handled(shortcut) = wizard.handle_key(chord) {
                debug!(?shortcut, "Wizard shortcut");
                match shortcut {
                    WizardShortcut::Save => save_draft(&draft, &command.output)?,
                    WizardShortcut::ToggleCommandPalette => {
                        command_palette(&mut wizard)?;
                        // Close the palette again
                        wizard.handle_key(KeyChord::command(Key::Char('k')));
                    }
                    WizardShortcut::Next | WizardShortcut::Previous => {}
                }
            }
            entered = wizard.active_index() != before;
            continue;
        }

        match action {
            MenuAction::Register => {
                if register(&draft, command.signed, &services).await? {
                    return Ok(());
                }
            }
            MenuAction::Quit => {
                println!("{}", "Builder closed. Unsaved changes are discarded.".yellow());
                return Ok(());
            }
            _ => {}
        }
        entered = false;
    }
}

fn print_header(wizard: &Wizard) {
    let section = wizard.active_section();
    println!();
    println!(
        "{} {} {}",
        format!("[{}/{}]", wizard.active_index() + 1, wizard.sections().len()).dimmed(),
        section.label.bold(),
        format!("({})", section.badge).cyan()
    );
    println!("{}", section.description.dimmed());
    println!(
        "Progress: {} {:.0}%",
        progress_bar(wizard.progress_percentage(), 20),
        wizard.progress_percentage()
    );
}

fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

async fn edit_section(
    wizard: &mut Wizard,
    draft: &mut AgentDraft,
    settings: &AgentSettingsService,
) -> Result<()> {
    let id = wizard.active_section_id().to_string();

    match id.as_str() {
        IDENTITY => {
            edit_identity(draft)?;
            if draft.is_identity_complete() {
                wizard.mark_section_complete(IDENTITY);
            }
        }
        DATA_SOURCES => {
            edit_rag_sources(settings, &draft.name).await?;
            sync_completion(wizard, settings, draft).await?;
        }
        RULES => {
            edit_policies(settings, &draft.name).await?;
            sync_completion(wizard, settings, draft).await?;
        }
        _ if wizard.is_completed(&id) => {
            println!("{}", "✓ Section complete".green());
        }
        _ => {
            let done = Confirm::new()
                .with_prompt("Mark this section complete?")
                .default(true)
                .interact()?;
            if done {
                wizard.mark_section_complete(&id);
            }
        }
    }
    Ok(())
}

/// Mark the sections whose editors already hold entries for this agent.
async fn sync_completion(
    wizard: &mut Wizard,
    settings: &AgentSettingsService,
    draft: &AgentDraft,
) -> Result<()> {
    let loaded = settings
        .load(&draft.name)
        .await
        .context("Failed to load agent settings")?;
    for section in loaded.completed_sections() {
        wizard.mark_section_complete(section);
    }
    Ok(())
}

async fn edit_policies(settings: &AgentSettingsService, agent: &str) -> Result<()> {
    loop {
        let policies = settings.policies(agent).await?;
        if policies.is_empty() {
            println!("{}", "No policies defined.".dimmed());
        }
        for policy in &policies {
            println!("  {} {}", policy.name.bold(), policy.rule.dimmed());
        }

        let mut choices = vec!["Add policy"];
        if !policies.is_empty() {
            choices.push("Remove policy");
        }
        choices.push("Done");
        let choice = Select::new()
            .with_prompt("Policies")
            .items(&choices)
            .default(0)
            .interact()?;

        match choices[choice] {
            "Add policy" => {
                let name: String = Input::<String>::new().with_prompt("Policy name").interact_text()?;
                let rule: String = Input::<String>::new()
                    .with_prompt("Rule expression (e.g. allow:read; deny:write)")
                    .interact_text()?;
                if let Err(e) = settings.add_policy(agent, &name, &rule).await {
                    println!("  {} {}", "✗".red(), e);
                }
            }
            "Remove policy" => {
                let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
                let index = Select::new()
                    .with_prompt("Remove which policy?")
                    .items(&names)
                    .interact()?;
                settings.remove_policy(agent, &policies[index].id).await?;
            }
            _ => return Ok(()),
        }
    }
}

async fn edit_rag_sources(settings: &AgentSettingsService, agent: &str) -> Result<()> {
    loop {
        let sources = settings.rag_sources(agent).await?;
        if sources.is_empty() {
            println!("{}", "No RAG sources added.".dimmed());
        }
        for source in &sources {
            println!("  {} {}", source.name.bold(), source.hash.dimmed());
        }

        let add = Confirm::new()
            .with_prompt("Add a document?")
            .default(sources.is_empty())
            .interact()?;
        if !add {
            return Ok(());
        }
        let path: String = Input::<String>::new().with_prompt("File path").interact_text()?;
        match settings.add_rag_file(agent, Path::new(path.trim())).await {
            Ok(source) => println!("{}", format!("✓ Added {} ({})", source.name, source.hash).green()),
            Err(e) => println!("  {} {}", "✗".red(), e),
        }
    }
}

fn edit_identity(draft: &mut AgentDraft) -> Result<()> {
    loop {
        draft.name = Input::<String>::new()
            .with_prompt("Agent name")
            .with_initial_text(draft.name.clone())
            .interact_text()?;

        let tagline: String = Input::<String>::new()
            .with_prompt("Tagline (max 80 characters)")
            .with_initial_text(draft.tagline.clone())
            .allow_empty(true)
            .interact_text()?;
        draft.set_tagline(&tagline);

        draft.description = Input::<String>::new()
            .with_prompt("Description")
            .with_initial_text(draft.description.clone())
            .allow_empty(true)
            .interact_text()?;

        let types: Vec<&str> = AgentType::ALL.iter().map(|t| t.as_str()).collect();
        let current = AgentType::ALL
            .iter()
            .position(|t| *t == draft.agent_type)
            .unwrap_or(0);
        let selected = Select::new()
            .with_prompt("Agent type")
            .items(&types)
            .default(current)
            .interact()?;
        draft.agent_type = AgentType::ALL[selected];

        let traits: Vec<&str> = PersonalityTrait::ALL.iter().map(|t| t.as_str()).collect();
        let chosen: Vec<bool> = PersonalityTrait::ALL
            .iter()
            .map(|t| draft.personality.contains(t))
            .collect();
        let picked = MultiSelect::new()
            .with_prompt("Personality (space to toggle)")
            .items(&traits)
            .defaults(&chosen)
            .interact()?;
        draft.personality = picked.into_iter().map(|i| PersonalityTrait::ALL[i]).collect();

        let public = Confirm::new()
            .with_prompt("Make this agent public?")
            .default(draft.visibility == Visibility::Public)
            .interact()?;
        draft.visibility = if public { Visibility::Public } else { Visibility::Private };

        let errors = draft.validate();
        if errors.is_empty() {
            return Ok(());
        }
        for error in &errors {
            println!("  {} {}", "✗".red(), error);
        }
    }
}

fn prompt_action() -> Result<MenuAction> {
    let labels: Vec<&str> = MenuAction::ALL.iter().map(|a| a.label()).collect();
    let index = Select::new()
        .with_prompt("Next step")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(MenuAction::ALL[index])
}

fn command_palette(wizard: &mut Wizard) -> Result<()> {
    let labels: Vec<String> = wizard
        .sections()
        .iter()
        .map(|s| {
            let mark = if wizard.is_completed(&s.id) { "✓" } else { " " };
            format!("{} {}", mark, s.label)
        })
        .collect();
    let index = Select::new()
        .with_prompt("Go to section")
        .items(&labels)
        .default(wizard.active_index())
        .interact()?;
    let id = wizard.sections()[index].id.clone();
    wizard.go_to_section(&id);
    Ok(())
}

fn save_draft(draft: &AgentDraft, output: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(draft).context("Failed to serialize draft")?;
    std::fs::write(output, yaml).with_context(|| format!("Failed to write draft to {:?}", output))?;
    println!("{}", format!("✓ Draft saved: {}", output.display()).green());
    Ok(())
}

/// Returns whether the agent was registered.
async fn register(draft: &AgentDraft, signed: bool, services: &BuilderServices) -> Result<bool> {
    let errors = draft.validate();
    if !errors.is_empty() {
        println!("{}", "Fix the identity section before registering:".yellow());
        for error in &errors {
            println!("  {} {}", "✗".red(), error);
        }
        return Ok(false);
    }

    let coordinator = services.coordinator()?;
    match agent::register(&coordinator, draft, signed, services).await {
        Ok(()) => Ok(true),
        Err(e) => {
            println!("{}", format!("✗ {:#}", e).red());
            Ok(false)
        }
    }
}
