use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use relay_core::{CoordinatorView, FillOutcome, FillPhase, TabId};
use relay_engine::{coordinator, CoordinatorHandle, SimulatedBrowser};
use relay_logging::{prompt_preview, relay_info, relay_warn};

use crate::config::RelayConfig;
use crate::scenario::{Scenario, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSummary {
    pub tab_id: TabId,
    pub url: String,
    pub phase: Option<FillPhase>,
    pub outcomes: Vec<FillOutcome>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub tabs: Vec<TabSummary>,
    pub view: CoordinatorView,
}

impl RunReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "relay run started {}", self.started_at.to_rfc3339());
        for tab in &self.tabs {
            let phase = tab
                .phase
                .map(|phase| format!("{phase:?}"))
                .unwrap_or_else(|| "closed".to_string());
            let _ = writeln!(
                out,
                "tab {:>3}  {:<40} {:<28} {:?}",
                tab.tab_id, tab.url, phase, tab.outcomes
            );
        }
        match &self.view.pending {
            Some(pending) => {
                let _ = writeln!(
                    out,
                    "pending dispatch {} \"{}\" auto_send={} bound={:?}",
                    pending.id,
                    prompt_preview(&pending.text),
                    pending.auto_send,
                    self.view.bound_tabs()
                );
            }
            None => {
                let _ = writeln!(out, "no dispatch pending");
            }
        }
        let _ = write!(out, "delivered to {:?}", self.view.delivered);
        out
    }
}

/// Plays a scenario against the simulated browser and summarizes every tab.
pub async fn run_scenario(config: &RelayConfig, scenario: &Scenario) -> Result<RunReport> {
    let started_at = Utc::now();
    let registry = config.registry();
    let (handle, actor) = coordinator(config.coordinator_settings(), registry.clone());
    let registry = Arc::new(registry);
    let browser = match &config.slot_dir {
        Some(dir) => SimulatedBrowser::with_slot_dir(
            handle.clone(),
            registry,
            config.fill_settings(),
            scenario.sim_sites(),
            dir.clone(),
        ),
        None => SimulatedBrowser::new(
            handle.clone(),
            registry,
            config.fill_settings(),
            scenario.sim_sites(),
        ),
    };
    let actor_task = tokio::spawn(actor.run(browser.clone()));

    for step in &scenario.steps {
        run_step(&handle, &browser, step).await?;
    }

    let view = handle.view().await?;
    let tabs = browser
        .tab_ids()
        .into_iter()
        .map(|tab_id| TabSummary {
            tab_id,
            url: browser.tab_url(tab_id).unwrap_or_default(),
            phase: browser.fill_phase(tab_id),
            outcomes: browser.outcomes(tab_id),
        })
        .collect();

    handle.shutdown();
    actor_task.await?;

    Ok(RunReport {
        started_at,
        tabs,
        view,
    })
}

async fn run_step(
    handle: &CoordinatorHandle,
    browser: &SimulatedBrowser,
    step: &Step,
) -> Result<()> {
    match step {
        Step::Panel(raw) => {
            let response = handle.request_json(raw).await;
            if response.success {
                relay_info!("panel request accepted");
            } else {
                relay_warn!("panel request rejected: {}", raw);
            }
        }
        Step::Wait(millis) => tokio::time::sleep(Duration::from_millis(*millis)).await,
        Step::OpenManual(url) => {
            browser.open_manual(url)?;
        }
        Step::Close(url) => browser.close_tab(tab_for(browser, url)?)?,
        Step::Reload(url) => browser.reload(tab_for(browser, url)?)?,
    }
    Ok(())
}

fn tab_for(browser: &SimulatedBrowser, url: &str) -> Result<TabId> {
    browser
        .tab_ids()
        .into_iter()
        .find(|tab_id| browser.tab_url(*tab_id).as_deref() == Some(url))
        .ok_or_else(|| anyhow!("no open tab on {url}"))
}
