// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! Critic review commands
//!
//! Commands: evaluate, list, approve, reject

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use crate::client::ApiClient;
use crate::commands::learning::print_json;

#[derive(Subcommand)]
pub enum CriticCommand {
    /// Ask the critic to review an agent's current prompt
    Evaluate {
        /// Agent type (cv_shortlisting, interview, email_scheduling, hr_chat)
        #[arg(value_name = "AGENT")]
        agent_type: String,

        /// Recent interactions to include
        #[arg(long, value_name = "N")]
        samples: Option<usize>,
    },

    /// List stored evaluations, newest first
    List {
        #[arg(long, value_name = "AGENT")]
        agent: Option<String>,

        /// pending_review, approved or rejected
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve an evaluation and apply its prompt
    Approve {
        #[arg(value_name = "EVALUATION_ID")]
        evaluation_id: String,
    },

    /// Reject an evaluation
    Reject {
        #[arg(value_name = "EVALUATION_ID")]
        evaluation_id: String,

        #[arg(long)]
        reason: Option<String>,
    },
}

pub async fn handle_command(command: CriticCommand, client: &ApiClient) -> Result<()> {
    match command {
        CriticCommand::Evaluate { agent_type, samples } => evaluate(client, &agent_type, samples).await,
        CriticCommand::List { agent, status } => list(client, agent.as_deref(), status.as_deref()).await,
        CriticCommand::Approve { evaluation_id } => {
            let body = client.approve(&evaluation_id).await?;
            println!("{}", format!("✓ Approved {}", evaluation_id).green());
            print_json(&body)
        }
        CriticCommand::Reject { evaluation_id, reason } => {
            let body = client.reject(&evaluation_id, reason.as_deref()).await?;
            println!("{}", format!("✓ Rejected {}", evaluation_id).yellow());
            print_json(&body)
        }
    }
}

async fn evaluate(client: &ApiClient, agent_type: &str, samples: Option<usize>) -> Result<()> {
    println!("Evaluating {} (this waits on the critic model)...", agent_type);
    let body = client.evaluate(agent_type, samples).await?;
    let evaluation = body.get("evaluation").unwrap_or(&body);

    println!();
    println!(
        "{} {}",
        "Evaluation:".bold(),
        evaluation.get("evaluation_id").and_then(Value::as_str).unwrap_or("?")
    );
    println!(
        "  Score: {}/10",
        evaluation.get("evaluation_score").and_then(Value::as_f64).unwrap_or_default()
    );

    if let Some(issues) = evaluation.get("issues_identified").and_then(Value::as_array) {
        println!("  {}", "Issues:".bold());
        for issue in issues.iter().filter_map(Value::as_str) {
            println!("    - {}", issue);
        }
    }
    if let Some(reasoning) = evaluation.get("improvement_reasoning").and_then(Value::as_str) {
        println!("  {} {}", "Reasoning:".bold(), reasoning);
    }
    if let Some(prompt) = evaluation.get("improved_prompt").and_then(Value::as_str) {
        println!("  {}", "Proposed prompt:".bold());
        for line in prompt.lines() {
            println!("    {}", line);
        }
    }

    println!();
    println!("Review with 'ruya critic approve <ID>' or 'ruya critic reject <ID>'.");
    Ok(())
}

async fn list(client: &ApiClient, agent: Option<&str>, status: Option<&str>) -> Result<()> {
    let body = client.list_evaluations(agent, status).await?;
    let evaluations = body.as_array().cloned().unwrap_or_default();

    if evaluations.is_empty() {
        println!("{}", "No evaluations found.".dimmed());
        return Ok(());
    }

    for evaluation in &evaluations {
        let status = evaluation.get("status").and_then(Value::as_str).unwrap_or("?");
        let status = match status {
            "approved" => status.green(),
            "rejected" => status.red(),
            _ => status.yellow(),
        };
        println!(
            "{:<36} {:<16} score {:>4.1}  {}",
            evaluation.get("evaluation_id").and_then(Value::as_str).unwrap_or("?"),
            evaluation.get("agent_type").and_then(Value::as_str).unwrap_or("?"),
            evaluation.get("evaluation_score").and_then(Value::as_f64).unwrap_or_default(),
            status,
        );
    }
    Ok(())
}
