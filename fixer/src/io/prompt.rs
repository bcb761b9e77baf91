//! Prompt rendering for the planner, file selector, and patch generator.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::types::{FileContent, Plan};

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const FILE_SELECTION_TEMPLATE: &str = include_str!("prompts/file_selection.md");
const DIFF_GENERATION_TEMPLATE: &str = include_str!("prompts/diff_generation.md");

/// Inputs for the initial planner message.
#[derive(Debug, Clone)]
pub struct PlannerPromptInput<'a> {
    pub repo_full_name: &'a str,
    pub issue_title: &'a str,
    pub issue_body: &'a str,
    pub skeleton: &'a str,
    pub max_steps: u32,
}

/// Inputs for one file-selection request.
#[derive(Debug, Clone)]
pub struct SelectionPromptInput<'a> {
    pub plan: &'a Plan,
    pub tree: &'a str,
    pub previous_files: &'a [String],
    pub previous_error: Option<&'a str>,
    pub max_files: usize,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("file_selection", FILE_SELECTION_TEMPLATE)
            .expect("file_selection template should be valid");
        env.add_template("diff_generation", DIFF_GENERATION_TEMPLATE)
            .expect("diff_generation template should be valid");
        Self { env }
    }

    pub fn render_planner(&self, input: &PlannerPromptInput<'_>) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            repo_full_name => input.repo_full_name,
            issue_title => input.issue_title.trim(),
            issue_body => Some(input.issue_body.trim()).filter(|s| !s.is_empty()),
            skeleton => input.skeleton,
            max_steps => input.max_steps,
        })?;
        Ok(rendered)
    }

    pub fn render_file_selection(&self, input: &SelectionPromptInput<'_>) -> Result<String> {
        let template = self.env.get_template("file_selection")?;
        let rendered = template.render(context! {
            plan => input.plan,
            tree => input.tree,
            previous_files => input.previous_files,
            previous_error => input.previous_error.map(str::trim).filter(|s| !s.is_empty()),
            max_files => input.max_files,
        })?;
        Ok(rendered)
    }

    pub fn render_diff_generation(&self, plan: &Plan, files: &[FileContent]) -> Result<String> {
        let template = self.env.get_template("diff_generation")?;
        let rendered = template.render(context! {
            plan => plan,
            files => files,
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan {
            summary: "Fix crash on empty input".to_string(),
            steps: vec![
                "Guard index.ts against empty input".to_string(),
                "Add a regression test".to_string(),
            ],
        }
    }

    #[test]
    fn planner_prompt_embeds_issue_and_skeleton() {
        let engine = PromptEngine::new();
        let rendered = engine
            .render_planner(&PlannerPromptInput {
                repo_full_name: "acme/widgets",
                issue_title: "Fix crash",
                issue_body: "",
                skeleton: "Top-level directories: src/",
                max_steps: 5,
            })
            .expect("render");
        assert!(rendered.contains("Repository: acme/widgets"));
        assert!(rendered.contains("Fix crash"));
        assert!(rendered.contains("No description provided."));
        assert!(rendered.contains("Top-level directories: src/"));
        assert!(rendered.contains("\"action\": \"list_directory\""));
        assert!(rendered.contains("at most 5 replies"));
    }

    #[test]
    fn first_selection_prompt_renders_none_placeholders() {
        let engine = PromptEngine::new();
        let plan = plan();
        let rendered = engine
            .render_file_selection(&SelectionPromptInput {
                plan: &plan,
                tree: "README.md\nsrc/\n  index.ts",
                previous_files: &[],
                previous_error: None,
                max_files: 3,
            })
            .expect("render");
        assert!(rendered.contains("1. Guard index.ts against empty input"));
        assert!(rendered.contains("2. Add a regression test"));
        assert!(rendered.contains("Files already tried in earlier attempts:\nNone"));
        assert!(rendered.contains("Error from the previous attempt:\nNone"));
        assert!(rendered.contains("at most 3 files"));
    }

    #[test]
    fn retry_selection_prompt_lists_history() {
        let engine = PromptEngine::new();
        let plan = plan();
        let tried = vec!["src/a.ts".to_string(), "src/b.ts".to_string()];
        let rendered = engine
            .render_file_selection(&SelectionPromptInput {
                plan: &plan,
                tree: "src/",
                previous_files: &tried,
                previous_error: Some("diff validation failed: corrupt patch"),
                max_files: 3,
            })
            .expect("render");
        assert!(rendered.contains("- src/a.ts\n- src/b.ts"));
        assert!(rendered.contains("diff validation failed: corrupt patch"));
        assert!(!rendered.contains("attempts:\nNone"));
    }

    #[test]
    fn diff_prompt_embeds_every_file() {
        let engine = PromptEngine::new();
        let files = vec![
            FileContent {
                path: "README.md".to_string(),
                content: "Old".to_string(),
            },
            FileContent {
                path: "src/index.ts".to_string(),
                content: "export const x = 1;".to_string(),
            },
        ];
        let rendered = engine
            .render_diff_generation(&plan(), &files)
            .expect("render");
        assert!(rendered.contains("=== README.md ===\nOld\n=== end of README.md ==="));
        assert!(rendered.contains("export const x = 1;"));
        assert!(rendered.contains("Do NOT wrap the diff in markdown code fences"));
    }
}
