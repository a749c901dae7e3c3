// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! `phantom config`: inspect, check and scaffold the builder manifest.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use phantom_core::domain::builder_config::BuilderConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration after discovery and env overrides
    Show {
        /// Also list every location discovery looks at
        #[arg(long)]
        paths: bool,
    },

    /// Load a manifest and report whether it is usable
    Validate {
        /// Manifest to check (defaults to the discovered one)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write a starter manifest
    Generate {
        /// Destination file
        #[arg(short, long, default_value = "./phantom-config.yaml")]
        output: PathBuf,

        /// Write the annotated template instead of the minimal one
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => {
            if paths {
                print_discovery(config_path.as_deref());
            }
            let config = BuilderConfig::load_or_default(config_path)
                .context("Failed to load configuration")?;
            print_config(&config);
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let config = BuilderConfig::load_or_default(file.or(config_path))
                .context("Failed to load configuration")?;
            config.validate().context("Configuration is invalid")?;
            println!("{}", "✓ Configuration is valid".green());
            Ok(())
        }
        ConfigCommand::Generate { output, examples } => {
            std::fs::write(&output, template(examples))
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{} {}", "✓ Wrote".green(), output.display());
            Ok(())
        }
    }
}

fn print_discovery(explicit: Option<&Path>) {
    println!("{}", "Discovery order".bold());
    match explicit {
        Some(path) => println!("  --config           {}", path.display()),
        None => println!("  --config           {}", "(unset)".dimmed()),
    }
    for candidate in BuilderConfig::config_candidates() {
        let marker = if candidate.exists() {
            "found".green()
        } else {
            "missing".dimmed()
        };
        println!(
            "  {:<18} {} [{}]",
            candidate.origin,
            candidate.path.display(),
            marker
        );
    }
    println!();
}

fn print_config(config: &BuilderConfig) {
    let api = &config.spec.api;
    let storage = &config.spec.storage;

    println!("{} {}", "Manifest:".bold(), config.metadata.name);
    println!("{}", "Backend".bold());
    println!("  url       {}", api.base_url);
    println!(
        "  token     {}",
        if api.resolved_api_key().is_some() { "set" } else { "none" }
    );
    println!(
        "  timeout   {}",
        api.request_timeout_secs
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("{}", "Local storage".bold());
    println!("  dir         {}", storage.resolved_path().display());
    println!("  listings    {}", storage.listings_key);
    println!("  signatures  {}", storage.signatures_key);
    println!("  wallet      {}", storage.wallet_key);
    println!("{} {}", "Explorer:".bold(), config.spec.explorer.base_url);
}

fn template(annotated: bool) -> &'static str {
    if annotated {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_templates_are_valid_manifests() {
        for annotated in [false, true] {
            let config = BuilderConfig::from_yaml_str(template(annotated)).unwrap();
            config.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("phantom-config.yaml");

        handle_command(
            ConfigCommand::Generate {
                output: output.clone(),
                examples: false,
            },
            None,
        )
        .await
        .unwrap();
        assert!(output.exists());

        handle_command(ConfigCommand::Validate { file: Some(output) }, None)
            .await
            .unwrap();
    }
}
