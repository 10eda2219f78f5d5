//! List command implementation.
//!
//! The `orchestrate list` command lists catalog steps by category.

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::registry::Step;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::workspace::Workspace;

/// The list command implementation.
pub struct ListCommand {
    workspace: Workspace,
    args: ListArgs,
}

impl ListCommand {
    pub fn new(workspace: Workspace, args: ListArgs) -> Self {
        Self { workspace, args }
    }

    fn selected(&self) -> Vec<&Step> {
        self.workspace
            .registry
            .steps()
            .iter()
            .filter(|s| {
                self.args
                    .category
                    .as_deref()
                    .map_or(true, |c| s.category == c)
            })
            .collect()
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let steps = self.selected();

        if self.args.json {
            let text = serde_json::to_string_pretty(&steps).map_err(anyhow::Error::from)?;
            ui.message(&text);
            return Ok(CommandResult::success());
        }

        if steps.is_empty() {
            match &self.args.category {
                Some(category) => ui.warning(&format!("No steps in category '{}'", category)),
                None => ui.warning("The step catalog is empty"),
            }
            return Ok(CommandResult::success());
        }

        let mut lines = Vec::new();
        for category in self.workspace.registry.categories() {
            let in_category: Vec<&&Step> =
                steps.iter().filter(|s| s.category == category).collect();
            if in_category.is_empty() {
                continue;
            }

            let theme = ui.theme();
            lines.push(format!("  {}", theme.header.apply_to(format!("{}:", category))));
            for step in in_category {
                let mut line = format!("    {}", theme.highlight.apply_to(&step.id));
                if step.name.is_some() {
                    line.push_str(&format!(" {}", step.display_name()));
                }
                line.push_str(&format!(
                    " {} {}",
                    theme.dim.apply_to("-"),
                    theme.command.apply_to(&step.command)
                ));

                let mut flags = Vec::new();
                if step.exclusive {
                    flags.push("exclusive".to_string());
                }
                if step.retries > 0 {
                    flags.push(format!("retries {}", step.retries));
                }
                if step.confirm.is_some() {
                    flags.push("confirm".to_string());
                }
                if !step.tags.is_empty() {
                    flags.push(format!("tags {}", step.tags.join(",")));
                }
                if !flags.is_empty() {
                    line.push_str(&format!(" {}", theme.dim.apply_to(format!("[{}]", flags.join("; ")))));
                }
                lines.push(line);

                if let Some(description) = &step.description {
                    lines.push(format!("      {}", theme.dim.apply_to(description)));
                }
            }
        }

        ui.message(&lines.join("\n"));
        Ok(CommandResult::success())
    }
}
