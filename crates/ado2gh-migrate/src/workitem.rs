//! Conversion of source work items into target issue payloads.

use tracing::trace;

use crate::markup::html_to_markup;
use crate::types::{IssuePayload, Mappings, WorkItem};

/// Stateless translator from [`WorkItem`] to [`IssuePayload`].
///
/// Missing or unknown source fields degrade to omitted sections and
/// labels; translation itself never fails.
#[derive(Debug, Clone, Default)]
pub struct WorkItemTranslator {
    mappings: Mappings,
}

impl WorkItemTranslator {
    pub fn new(mappings: Mappings) -> Self {
        Self { mappings }
    }

    pub fn translate(&self, item: &WorkItem) -> IssuePayload {
        trace!(id = item.id, "translating work item");
        IssuePayload {
            title: item.title.clone(),
            body: self.body(item),
            labels: self.labels(item),
        }
    }

    fn body(&self, item: &WorkItem) -> String {
        let mut body = String::new();
        body.push_str("**Migrated from Azure DevOps**\n\n");
        body.push_str(&format!("- Original ID: {}\n", item.id));
        body.push_str(&format!("- Type: {}\n", item.item_type));
        body.push_str(&format!("- State: {}\n", item.state));
        if let Some(assignee) = item.assigned_to.as_deref().filter(|a| !a.is_empty()) {
            body.push_str(&format!("- Originally assigned to: {assignee}\n"));
        }

        push_section(&mut body, "Description", item.description.as_deref());
        push_section(
            &mut body,
            "Acceptance Criteria",
            item.acceptance_criteria.as_deref(),
        );
        if item.item_type.eq_ignore_ascii_case("bug") {
            push_section(&mut body, "Repro Steps", item.repro_steps.as_deref());
        }
        body
    }

    fn labels(&self, item: &WorkItem) -> Vec<String> {
        let mut labels = vec!["migrated".to_string()];

        let type_label = self
            .mappings
            .work_item_types
            .get(&item.item_type)
            .cloned()
            .unwrap_or_else(|| format!("type:{}", slug(&item.item_type)));
        labels.push(type_label);

        // Unmapped states get no label rather than an invented one.
        if let Some(state_label) = self.mappings.states.get(&item.state) {
            labels.push(state_label.clone());
        }

        if let Some(priority) = item.priority {
            let key = priority.to_string();
            let priority_label = self
                .mappings
                .priorities
                .get(&key)
                .cloned()
                .unwrap_or_else(|| format!("priority:{key}"));
            labels.push(priority_label);
        }

        labels
    }
}

fn push_section(body: &mut String, heading: &str, html: Option<&str>) {
    let Some(html) = html.filter(|s| !s.trim().is_empty()) else {
        return;
    };
    let text = html_to_markup(html);
    if text.is_empty() {
        return;
    }
    body.push_str(&format!("\n## {heading}\n\n{text}\n"));
}

fn slug(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "-")
}
