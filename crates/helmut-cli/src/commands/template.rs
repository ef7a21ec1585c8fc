//! Template management commands for CLI.

use clap::Subcommand;
use helmut_core::{CoreError, NewTemplate, NewTemplateTask, TemplateId, TemplateStore};

use super::{coordinator, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates with their tasks
    List,
    /// Create a template
    Create {
        /// Template name
        #[arg(long)]
        name: String,
        /// Short description
        #[arg(long, default_value = "")]
        description: String,
        /// Icon glyph
        #[arg(long)]
        icon: Option<String>,
        /// Child task as "Title:MINUTES" (repeatable, kept in order)
        #[arg(long = "task", value_parser = parse_child)]
        tasks: Vec<(String, u32)>,
    },
    /// Update a template; --task replaces the whole task list
    Update {
        /// Template ID
        id: TemplateId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Child task as "Title:MINUTES" (repeatable, kept in order)
        #[arg(long = "task", value_parser = parse_child)]
        tasks: Vec<(String, u32)>,
    },
    /// Delete a template and its tasks
    Delete {
        /// Template ID
        id: TemplateId,
    },
    /// Add a template's tasks to today's list
    Apply {
        /// Template ID
        id: TemplateId,
    },
    /// Insert the built-in templates if none exist
    Seed,
}

fn parse_child(raw: &str) -> Result<(String, u32), String> {
    let (title, minutes) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected \"Title:MINUTES\", got \"{raw}\""))?;
    let minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| format!("invalid minutes in \"{raw}\""))?;
    Ok((title.trim().to_string(), minutes))
}

fn children(tasks: Vec<(String, u32)>) -> Vec<NewTemplateTask> {
    tasks
        .into_iter()
        .enumerate()
        .map(|(i, (title, minutes))| NewTemplateTask::new(title, minutes, i as i64))
        .collect()
}

pub fn run(action: TemplateAction) -> CliResult {
    let store = open_store()?;

    match action {
        TemplateAction::List => {
            print_json(&store.templates_snapshot())?;
        }
        TemplateAction::Create {
            name,
            description,
            icon,
            tasks,
        } => {
            let mut header = NewTemplate::new(name).with_description(description);
            if let Some(icon) = icon {
                header = header.with_icon(icon);
            }
            let created = store.create_template(header, children(tasks))?;
            print_json(&created)?;
        }
        TemplateAction::Update {
            id,
            name,
            description,
            icon,
            tasks,
        } => {
            let existing = store
                .get_template(id)?
                .ok_or(CoreError::NotFound { entity: "template", id })?;
            let header = NewTemplate {
                name: name.unwrap_or(existing.template.name),
                description: description.unwrap_or(existing.template.description),
                icon: icon.unwrap_or(existing.template.icon),
            };
            let new_children = if tasks.is_empty() {
                existing
                    .tasks
                    .into_iter()
                    .map(|t| NewTemplateTask::new(t.title, t.estimated_minutes, t.order))
                    .collect()
            } else {
                children(tasks)
            };
            let updated = store.update_template(id, header, new_children)?;
            print_json(&updated)?;
        }
        TemplateAction::Delete { id } => {
            if !store.delete_template(id)? {
                return Err(CoreError::NotFound { entity: "template", id }.into());
            }
            println!("Template deleted: {id}");
        }
        TemplateAction::Apply { id } => {
            let template = store
                .get_template(id)?
                .ok_or(CoreError::NotFound { entity: "template", id })?;
            let added = coordinator(store)?.add_template_to_today(&template)?;
            print_json(&added)?;
        }
        TemplateAction::Seed => {
            let created = store.seed_default_templates()?;
            println!("Seeded {created} template(s)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_title_and_minutes() {
        assert_eq!(parse_child("Stretch:10"), Ok(("Stretch".to_string(), 10)));
        assert_eq!(
            parse_child("Read: ch 2: 25"),
            Ok(("Read: ch 2".to_string(), 25))
        );
        assert!(parse_child("Stretch").is_err());
        assert!(parse_child("Stretch:ten").is_err());
    }
}
