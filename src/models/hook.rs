use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct HookModel {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct HookWorkspace {
    pub current_dir: Option<String>,
}

/// Optional cost summary provided by Claude Code's statusLine input
#[derive(Deserialize, Debug, Default, Clone)]
pub struct HookCost {
    pub total_cost_usd: Option<f64>,
    pub total_lines_added: Option<i64>,
    pub total_lines_removed: Option<i64>,
}

/// Context window figures reported by newer Claude Code versions
#[derive(Deserialize, Debug, Default, Clone)]
pub struct HookContextWindow {
    pub context_window_size: Option<u64>,
    pub used_percentage: Option<f64>,
}

/// The JSON object Claude Code writes to the statusline's stdin
#[derive(Deserialize, Debug, Default, Clone)]
pub struct HookJson {
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    pub transcript_path: Option<String>,
    pub cwd: Option<String>,
    #[serde(default)]
    pub model: HookModel,
    #[serde(default)]
    pub workspace: HookWorkspace,
    pub cost: Option<HookCost>,
    pub context_window: Option<HookContextWindow>,
}

impl HookJson {
    pub fn model_name(&self) -> &str {
        self.model
            .display_name
            .as_deref()
            .or(self.model.id.as_deref())
            .unwrap_or("Unknown")
    }

    /// Model id used for pricing; falls back to the display name
    pub fn model_id(&self) -> &str {
        self.model
            .id
            .as_deref()
            .or(self.model.display_name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn current_dir(&self) -> &str {
        self.workspace
            .current_dir
            .as_deref()
            .or(self.cwd.as_deref())
            .unwrap_or(".")
    }
}
