// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! Learning queries against a running server: metrics, insights, state

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use crate::client::ApiClient;

pub(crate) fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn f64_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or_default()
}

/// One-line summary of an `AgentMetrics` document.
pub fn metrics_line(metrics: &Value) -> String {
    let agent = metrics.get("agent_type").and_then(Value::as_str).unwrap_or("?");
    let total = u64_field(metrics, "total_actions");
    let successful = u64_field(metrics, "successful_actions");
    let success_rate = if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    };

    format!(
        "{:<18} actions {:>5}  success {:>5.1}%  avg rating {:.2}  patterns {:>3}  vs baseline {:+.1}%",
        agent,
        total,
        success_rate,
        f64_field(metrics, "average_rating"),
        u64_field(metrics, "patterns_learned"),
        f64_field(metrics, "improvement_rate"),
    )
}

pub async fn metrics(client: &ApiClient, agent_type: Option<&str>, json: bool) -> Result<()> {
    let body = client.metrics(agent_type).await?;
    if json {
        return print_json(&body);
    }

    match &body {
        Value::Array(all) if all.is_empty() => println!("{}", "No metrics recorded yet.".dimmed()),
        Value::Array(all) => {
            println!("{}", "Agent metrics:".bold());
            for metrics in all {
                println!("  {}", metrics_line(metrics));
            }
        }
        single => println!("{}", metrics_line(single)),
    }
    Ok(())
}

pub async fn insights(client: &ApiClient, agent_type: &str, json: bool) -> Result<()> {
    let body = client.insights(agent_type).await?;
    if json {
        return print_json(&body);
    }

    let trend = body.get("performance_trend").and_then(Value::as_str).unwrap_or("unknown");
    let trend = if trend == "improving" { trend.green() } else { trend.yellow() };

    println!("{} {}", "Insights for".bold(), agent_type.bold());
    if let Some(metrics) = body.get("metrics") {
        println!("  {}", metrics_line(metrics));
    }
    println!("  Trend: {}", trend);
    println!("  Recent feedback: {}", u64_field(&body, "recent_feedback_count"));

    let patterns = body.get("top_patterns").and_then(Value::as_array);
    match patterns {
        Some(patterns) if !patterns.is_empty() => {
            println!("  {}", "Top patterns:".bold());
            for pattern in patterns {
                println!(
                    "    {:<40} {:<18} rate {:.2}  used {}",
                    pattern.get("pattern_id").and_then(Value::as_str).unwrap_or("?"),
                    pattern.get("pattern_type").and_then(Value::as_str).unwrap_or("?"),
                    f64_field(pattern, "success_rate"),
                    u64_field(pattern, "usage_count"),
                );
            }
        }
        _ => println!("  {}", "No patterns learned yet.".dimmed()),
    }
    Ok(())
}

pub async fn state(
    client: &ApiClient,
    agent_type: &str,
    learning_enabled: Option<bool>,
    auto_adapt: Option<bool>,
    exploration_rate: Option<f64>,
) -> Result<()> {
    let state = if learning_enabled.is_none() && auto_adapt.is_none() && exploration_rate.is_none() {
        client.learning_state(agent_type).await?
    } else {
        let body = client
            .update_learning_state(agent_type, learning_enabled, auto_adapt, exploration_rate)
            .await?;
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            println!("{}", format!("✓ {}", message).green());
        }
        body.get("state").cloned().unwrap_or(body)
    };

    print_json(&state)
}
