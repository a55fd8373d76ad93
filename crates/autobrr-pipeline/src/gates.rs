//! External script and webhook gates (`spec.md` §4.5 step 8).
//!
//! Both gates are advisory: they can veto an otherwise-approved release by
//! exiting with an unexpected status or returning an unexpected HTTP status.
//! Arguments and request bodies are templated against the release's torrent
//! name and info URL using the same `{{ .var }}` placeholder syntax
//! `autobrr_indexer::render_template` uses for indexer URL templates.

use std::collections::HashMap;
use std::time::Duration;

use autobrr_filter::{ExternalScriptGate, ExternalWebhookGate};
use autobrr_release::Release;
use tokio::process::Command;
use tracing::warn;

const GATE_TIMEOUT: Duration = Duration::from_secs(30);

fn template_vars(release: &Release) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("torrentName".to_string(), release.torrent_name.clone());
    vars.insert("torrentUrl".to_string(), release.torrent_url.clone());
    vars.insert("infoUrl".to_string(), release.info_url.clone());
    vars.insert("indexer".to_string(), release.indexer.clone());
    vars
}

/// Run the external script gate, if enabled. `Ok(true)` means the release
/// passes; `Ok(false)` means the script vetoed it; `Err` means the script
/// itself could not be run (treated as a veto by the caller, logged here).
pub async fn run_script_gate(gate: &ExternalScriptGate, release: &Release) -> anyhow::Result<bool> {
    if !gate.enabled {
        return Ok(true);
    }
    let vars = template_vars(release);
    let args: Vec<String> = gate
        .args
        .iter()
        .map(|arg| autobrr_indexer::render_template(arg, &vars, &HashMap::new()).unwrap_or_else(|_| arg.clone()))
        .collect();

    let output = tokio::time::timeout(GATE_TIMEOUT, Command::new(&gate.cmd).args(&args).output()).await??;
    let status = output.status.code().unwrap_or(-1);
    if status != gate.expect_status {
        warn!(
            cmd = %gate.cmd,
            status,
            expected = gate.expect_status,
            "external script gate vetoed release"
        );
        return Ok(false);
    }
    Ok(true)
}

/// Run the external webhook gate, if enabled. Same `Ok(bool)` contract as
/// [`run_script_gate`].
pub async fn run_webhook_gate(
    client: &reqwest::Client,
    gate: &ExternalWebhookGate,
    release: &Release,
) -> anyhow::Result<bool> {
    if !gate.enabled {
        return Ok(true);
    }
    let vars = template_vars(release);
    let body = autobrr_indexer::render_template(&gate.data, &vars, &HashMap::new()).unwrap_or_else(|_| gate.data.clone());

    let response = client.post(&gate.host).body(body).timeout(GATE_TIMEOUT).send().await?;
    let status = response.status().as_u16();
    if status != gate.expect_status {
        warn!(
            host = %gate.host,
            status,
            expected = gate.expect_status,
            "external webhook gate vetoed release"
        );
        return Ok(false);
    }
    Ok(true)
}
