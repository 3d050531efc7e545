//! Scripted sessions for the simulated browser, stored as RON.
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use relay_engine::SimSite;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub sites: Vec<SiteScript>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteScript {
    pub url: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
    #[serde(default = "default_load_delay_ms")]
    pub load_delay_ms: u64,
    #[serde(default)]
    pub listener_delay_ms: u64,
    /// `(after_ms, html)` re-render after load.
    #[serde(default)]
    pub late_render: Option<(u64, String)>,
    #[serde(default)]
    pub stored_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Raw JSON panel message, as the composition panel would send it.
    Panel(String),
    Wait(u64),
    OpenManual(String),
    Close(String),
    Reload(String),
}

fn default_load_delay_ms() -> u64 {
    100
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn sim_sites(&self) -> Vec<SimSite> {
        self.sites.iter().map(SiteScript::to_sim_site).collect()
    }
}

impl SiteScript {
    fn to_sim_site(&self) -> SimSite {
        let mut site = SimSite::new(&self.url, &self.html)
            .load_delay(Duration::from_millis(self.load_delay_ms))
            .listener_delay(Duration::from_millis(self.listener_delay_ms));
        if let Some(final_url) = &self.redirect_to {
            site = site.redirect_to(final_url);
        }
        if let Some((after_ms, html)) = &self.late_render {
            site = site.late_render(Duration::from_millis(*after_ms), html);
        }
        if let Some(prompt) = &self.stored_prompt {
            site = site.stored_prompt(prompt);
        }
        site
    }
}
