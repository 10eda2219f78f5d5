//! Plan command implementation.
//!
//! `orchestrate plan` loads and resolves a playbook exactly like `run`,
//! then prints the phase groups instead of running them. Conditions are
//! shown, not evaluated.

use serde::Serialize;

use crate::cli::args::PlanArgs;
use crate::error::Result;
use crate::playbook::Playbook;
use crate::runner::{resolve, PhaseGroup};
use crate::ui::{Theme, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::workspace::Workspace;

/// The plan command implementation.
pub struct PlanCommand {
    workspace: Workspace,
    args: PlanArgs,
}

/// Serialized form of a resolved plan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub playbook: String,
    pub profile: String,
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub index: usize,
    pub phases: Vec<PhaseView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseView {
    pub name: String,
    pub max_concurrency: usize,
    pub continue_on_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub steps: Vec<String>,
    /// Steps that run alone.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclusive: Vec<String>,
}

impl PlanView {
    pub fn new(playbook: &Playbook, profile: &str, groups: &[PhaseGroup]) -> Self {
        Self {
            playbook: playbook.name.clone(),
            profile: profile.to_string(),
            groups: groups
                .iter()
                .map(|group| GroupView {
                    index: group.index,
                    phases: group
                        .phases
                        .iter()
                        .map(|phase| PhaseView {
                            name: phase.name.clone(),
                            max_concurrency: phase.max_concurrency,
                            continue_on_error: phase.continue_on_error,
                            condition: phase.condition.as_ref().map(|c| c.to_string()),
                            steps: phase.steps.iter().map(|s| s.id.clone()).collect(),
                            exclusive: phase
                                .steps
                                .iter()
                                .filter(|s| s.exclusive)
                                .map(|s| s.id.clone())
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Human-readable rendering.
    pub fn render(&self, theme: &Theme) -> String {
        let mut lines = vec![theme.format_header(&format!(
            "{} (profile {})",
            self.playbook, self.profile
        ))];

        for group in &self.groups {
            lines.push(format!("group {}", group.index + 1));
            for phase in &group.phases {
                let mut policy = vec![format!("max {}", phase.max_concurrency)];
                if phase.continue_on_error {
                    policy.push("continue on error".to_string());
                }
                if let Some(condition) = &phase.condition {
                    policy.push(format!("when {}", condition));
                }
                lines.push(format!(
                    "  {} {}",
                    theme.highlight.apply_to(&phase.name),
                    theme.dim.apply_to(format!("({})", policy.join(", ")))
                ));
                for step in &phase.steps {
                    if phase.exclusive.contains(step) {
                        lines.push(format!("    {} {}", step, theme.warning.apply_to("[exclusive]")));
                    } else {
                        lines.push(format!("    {}", step));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

impl PlanCommand {
    pub fn new(workspace: Workspace, args: PlanArgs) -> Self {
        Self { workspace, args }
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let profile = self.workspace.profile(self.args.profile.as_deref());
        // Fails on unknown profiles the same way a run would.
        self.workspace.config.resolve_features(&profile)?;

        let playbook = self.workspace.load_playbook(&self.args.playbook, &profile)?;
        let groups = resolve(&playbook)?;
        let view = PlanView::new(&playbook, &profile, &groups);

        let text = if self.args.json {
            serde_json::to_string_pretty(&view).map_err(anyhow::Error::from)?
        } else {
            view.render(ui.theme())
        };
        ui.message(&text);
        Ok(CommandResult::success())
    }
}
