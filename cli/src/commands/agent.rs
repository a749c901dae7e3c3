// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! Agent commands
//!
//! Commands: register, list, show, attest

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use phantom_core::application::registration::{RegistrationCoordinator, RegistrationOutcome};
use phantom_core::domain::draft::AgentDraft;
use phantom_core::domain::events::RegistrationEvent;
use phantom_core::domain::listing::LocalListingRecord;
use phantom_core::domain::registration::RegistrationError;
use phantom_core::domain::repository::LocalListingStore;
use phantom_core::infrastructure::event_bus::{DomainEvent, EventReceiver};

use crate::services::BuilderServices;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Register an agent draft
    Register {
        /// Path to agent draft YAML file
        #[arg(long, value_name = "FILE")]
        draft: PathBuf,

        /// Register through the relay with a wallet signature
        #[arg(long)]
        signed: bool,
    },

    /// List locally registered agents
    List,

    /// Show a registered agent (YAML)
    Show {
        /// Listing id or agent name
        #[arg(value_name = "ID_OR_NAME")]
        agent: String,
    },

    /// Sign an attestation for an agent with the local wallet
    Attest {
        /// Agent id
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },
}

pub async fn handle_command(command: AgentCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = BuilderServices::load(config_path)?;

    match command {
        AgentCommand::Register { draft, signed } => register_from_file(&draft, signed, &services).await,
        AgentCommand::List => list_agents(&services).await,
        AgentCommand::Show { agent } => show_agent(&agent, &services).await,
        AgentCommand::Attest { agent_id } => attest_agent(&agent_id, &services).await,
    }
}

/// Read and validate a draft YAML file.
pub fn load_draft(path: &Path) -> Result<AgentDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft: {:?}", path))?;
    let draft: AgentDraft = serde_yaml::from_str(&content).context("Failed to parse draft YAML")?;

    let errors = draft.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {} {}: {}", "✗".red(), error.field(), error);
        }
        bail!("Draft is invalid ({} problem(s))", errors.len());
    }
    Ok(draft)
}

async fn register_from_file(path: &Path, signed: bool, services: &BuilderServices) -> Result<()> {
    let draft = load_draft(path)?;
    let coordinator = services.coordinator()?;
    register(&coordinator, &draft, signed, services).await
}

/// Run one registration and report the outcome.
pub async fn register(
    coordinator: &RegistrationCoordinator,
    draft: &AgentDraft,
    signed: bool,
    services: &BuilderServices,
) -> Result<()> {
    let mut events = coordinator.event_bus().subscribe();

    println!("Registering agent: {}", draft.name.bold());
    let result = if signed {
        coordinator.register_signed(draft).await
    } else {
        coordinator.register_simple(draft).await
    };
    print_warnings(&mut events);

    match result {
        Ok(outcome) => {
            print_outcome(&outcome, services.explorer_base());
            Ok(())
        }
        Err(RegistrationError::Persistence { result, source }) => {
            println!(
                "{}",
                "⚠ Agent registered, but the local listing could not be saved".yellow()
            );
            if let Some(url) = result.explorer_url(services.explorer_base()) {
                println!("  Explorer: {}", url);
            }
            Err(source).context("Failed to save local listing")
        }
        Err(e) => bail!(e.user_message()),
    }
}

fn print_warnings(events: &mut EventReceiver) {
    while let Ok(event) = events.try_recv() {
        match event {
            DomainEvent::Registration(RegistrationEvent::SignerConnectFailed { error, .. }) => {
                println!("{}", format!("⚠ Wallet connection failed: {}", error).yellow());
            }
            DomainEvent::Registration(RegistrationEvent::SigningSkipped { reason, .. }) => {
                println!("{}", format!("⚠ Registering unsigned: {}", reason).yellow());
            }
            _ => {}
        }
    }
}

fn print_outcome(outcome: &RegistrationOutcome, explorer_base: &str) {
    println!("{}", "✓ Agent registered successfully!".green().bold());
    println!("  Listing ID: {}", outcome.listing_id());
    if let Some(signer) = &outcome.signer {
        let state = if outcome.is_signed() { "signed" } else { "unsigned" };
        println!("  Signer: {} ({})", signer.short(), state);
    }
    if let Some(tx) = outcome.result.tx_hash() {
        println!("  Transaction: {}", tx);
    }
    if let Some(url) = outcome.result.explorer_url(explorer_base) {
        println!("  Explorer: {}", url);
    }
}

async fn list_agents(services: &BuilderServices) -> Result<()> {
    let records = services
        .listings
        .all()
        .await
        .context("Failed to read local listings")?;

    if records.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", records.len());
    println!("{:<44} {:<24} {:<20} {}", "ID", "NAME", "TYPE", "SAVED");
    for record in records {
        println!("{}", format_row(&record));
    }
    Ok(())
}

fn format_row(record: &LocalListingRecord) -> String {
    let saved = record
        .saved_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<44} {:<24} {:<20} {}",
        record.id,
        record.agent_data.name.bold(),
        record.agent_data.agent_type.as_str(),
        saved
    )
}

async fn show_agent(id_or_name: &str, services: &BuilderServices) -> Result<()> {
    let record = match services.listings.find_by_id(id_or_name).await? {
        Some(record) => Some(record),
        None => services.listings.find_by_name(id_or_name).await?,
    };
    let Some(record) = record else {
        bail!("No registered agent matches '{}'", id_or_name);
    };

    let yaml = serde_yaml::to_string(&record).context("Failed to serialize listing")?;
    println!("{}", yaml);

    if let Some(agent_id) = record.on_chain.agent_id() {
        let attestation = services
            .attestation_service()
            .signature_for(&agent_id)
            .await?;
        if let Some(attestation) = attestation {
            println!("{} {}", "Attested:".bold(), attestation.signature);
        }
    }
    Ok(())
}

async fn attest_agent(agent_id: &str, services: &BuilderServices) -> Result<()> {
    let attestation = services
        .attestation_service()
        .attest(agent_id)
        .await
        .context("Failed to attest agent")?;

    println!("{}", format!("✓ Agent {} attested", agent_id).green());
    if let Some(signer) = &attestation.signer {
        println!("  Signer: {}", signer);
    }
    println!("  Signature: {}", attestation.signature);
    Ok(())
}
