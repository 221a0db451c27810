//! Deterministic fallback interpreter.
//!
//! Maps free text to a tool invocation (or a canned reply) when no model
//! backend is available. Pattern groups are checked in a fixed priority
//! order and the first match wins — "add task to list my pending items"
//! must reach the add-task matcher before the list-task matcher sees it.

use crate::types::ToolInvocation;
use regex::Regex;
use serde_json::{Map, Value};

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

const GREETING_REPLY: &str = "Hello! I'm your task management assistant. I can help you:\n\
    - Add tasks: 'add task [title]'\n\
    - List tasks: 'show my tasks' or 'list tasks'\n\
    - Complete tasks: 'complete task [id]' or 'mark task [id] as done'\n\
    - Delete tasks: 'delete task [id]'\n\
    \nWhat would you like to do?";

const HELP_REPLY: &str = "I can help you manage your tasks! Here's what I can do:\n\
    \n**Add a task**: 'add task buy groceries' or 'create task finish report'\n\
    **List tasks**: 'show my tasks', 'list all tasks', 'show pending tasks'\n\
    **Complete a task**: 'complete task 1' or 'mark task 2 as done'\n\
    **Delete a task**: 'delete task 3' or 'remove task 1'\n\
    \nJust tell me what you'd like to do!";

const UNRECOGNIZED_REPLY: &str = "I'm not sure what you'd like to do. Try:\n\
    - 'add task [title]' to create a new task\n\
    - 'show my tasks' to see all tasks\n\
    - 'complete task [id]' to mark a task as done\n\
    - 'delete task [id]' to remove a task\n\
    \nOr say 'help' for more information!";

const ADD_PATTERNS: &[&str] = &[
    r"add (?:a )?task[:\s]+(.+)",
    r"create (?:a )?task[:\s]+(.+)",
    r"new task[:\s]+(.+)",
    r"add[:\s]+(.+)",
    r"create[:\s]+(.+)",
];

const LIST_PATTERNS: &[&str] = &[
    r"(show|list|display|get|view).*tasks?",
    r"what.*tasks?.*have",
    r"my tasks?",
    r"all tasks?",
    r"pending tasks?",
    r"completed tasks?",
];

const COMPLETE_PATTERNS: &[&str] = &[
    r"(?:complete|finish|done|mark).*task[:\s#]*(\d+)",
    r"task[:\s#]*(\d+).*(?:complete|done|finish)",
    r"mark[:\s#]*(\d+).*(?:complete|done)",
    r"complete[:\s#]*(\d+)",
    r"finish[:\s#]*(\d+)",
];

const DELETE_PATTERNS: &[&str] = &[
    r"(?:delete|remove|cancel).*task[:\s#]*(\d+)",
    r"task[:\s#]*(\d+).*(?:delete|remove)",
    r"delete[:\s#]*(\d+)",
    r"remove[:\s#]*(\d+)",
];

const UPDATE_PATTERNS: &[&str] = &[
    r"(?:update|change|edit|rename).*task[:\s#]*(\d+).*(?:to|as|with)[:\s]+(.+)",
    r"task[:\s#]*(\d+).*(?:rename|change).*(?:to|as)[:\s]+(.+)",
];

/// What the parser made of one message: at most one invocation, plus the
/// reply text to use when no tool runs (or the tool produces no message).
#[derive(Debug, Clone)]
pub struct ParsedIntent {
    pub invocation: Option<ToolInvocation>,
    pub reply: String,
}

impl ParsedIntent {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            invocation: None,
            reply: reply.into(),
        }
    }

    fn tool(invocation: ToolInvocation, reply: impl Into<String>) -> Self {
        Self {
            invocation: Some(invocation),
            reply: reply.into(),
        }
    }
}

/// Pattern-matching intent classifier. Pure: no store or network access.
pub struct IntentParser {
    add: Vec<Regex>,
    list: Vec<Regex>,
    complete: Vec<Regex>,
    delete: Vec<Regex>,
    update: Vec<Regex>,
}

impl IntentParser {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
        };
        Self {
            add: compile(ADD_PATTERNS),
            list: compile(LIST_PATTERNS),
            complete: compile(COMPLETE_PATTERNS),
            delete: compile(DELETE_PATTERNS),
            update: compile(UPDATE_PATTERNS),
        }
    }

    pub fn parse(&self, message: &str) -> ParsedIntent {
        let lower = message.to_lowercase().trim().to_string();

        if GREETINGS.iter().any(|g| lower.starts_with(g)) {
            return ParsedIntent::reply_only(GREETING_REPLY);
        }

        if lower.contains("help") || lower.contains("what can you do") {
            return ParsedIntent::reply_only(HELP_REPLY);
        }

        for pattern in &self.add {
            if let Some(caps) = pattern.captures(&lower) {
                let raw = caps[1].trim();
                let title = raw
                    .strip_prefix("to ")
                    .or_else(|| raw.strip_prefix("for "))
                    .unwrap_or(raw);
                if !title.is_empty() {
                    let mut args = Map::new();
                    args.insert("title".into(), Value::String(title_case(title)));
                    return ParsedIntent::tool(
                        ToolInvocation::new("add_task", args),
                        "I'll add that task for you!",
                    );
                }
            }
        }

        if self.list.iter().any(|p| p.is_match(&lower)) {
            let status = if lower.contains("pending")
                || lower.contains("active")
                || lower.contains("incomplete")
            {
                "pending"
            } else if lower.contains("completed")
                || lower.contains("done")
                || lower.contains("finished")
            {
                "completed"
            } else {
                "all"
            };
            let mut args = Map::new();
            args.insert("status".into(), Value::String(status.into()));
            return ParsedIntent::tool(ToolInvocation::new("list_tasks", args), "");
        }

        if let Some(task_id) = first_id(&self.complete, &lower) {
            let mut args = Map::new();
            args.insert("task_id".into(), Value::from(task_id));
            return ParsedIntent::tool(ToolInvocation::new("complete_task", args), "");
        }

        if let Some(task_id) = first_id(&self.delete, &lower) {
            let mut args = Map::new();
            args.insert("task_id".into(), Value::from(task_id));
            return ParsedIntent::tool(ToolInvocation::new("delete_task", args), "");
        }

        for pattern in &self.update {
            if let Some(caps) = pattern.captures(&lower) {
                if let Ok(task_id) = caps[1].parse::<i64>() {
                    let mut args = Map::new();
                    args.insert("task_id".into(), Value::from(task_id));
                    args.insert(
                        "title".into(),
                        Value::String(title_case(caps[2].trim())),
                    );
                    return ParsedIntent::tool(ToolInvocation::new("update_task", args), "");
                }
            }
        }

        ParsedIntent::reply_only(UNRECOGNIZED_REPLY)
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

fn first_id(patterns: &[Regex], text: &str) -> Option<i64> {
    patterns
        .iter()
        .find_map(|p| p.captures(text))
        .and_then(|caps| caps[1].parse::<i64>().ok())
}

/// Capitalize the first letter of each whitespace-separated word.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new()
    }

    fn tool_name(intent: &ParsedIntent) -> &str {
        intent.invocation.as_ref().map(|i| i.name.as_str()).unwrap_or("")
    }

    #[test]
    fn test_greeting_wins_over_everything() {
        let intent = parser().parse("Hey, can you list my tasks?");
        assert!(intent.invocation.is_none());
        assert!(intent.reply.contains("task management assistant"));
    }

    #[test]
    fn test_help_returns_capability_summary() {
        let intent = parser().parse("what can you do?");
        assert!(intent.invocation.is_none());
        assert!(intent.reply.contains("**Add a task**"));
    }

    #[test]
    fn test_add_task_extracts_and_title_cases() {
        let intent = parser().parse("add task buy milk");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "add_task");
        assert_eq!(invocation.arguments["title"], "Buy Milk");
        assert_eq!(intent.reply, "I'll add that task for you!");
    }

    #[test]
    fn test_add_task_strips_leading_to() {
        let intent = parser().parse("create a task to finish the report");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.arguments["title"], "Finish The Report");
    }

    #[test]
    fn test_add_beats_list_in_priority_order() {
        // The title mentions pending items; pattern order must still route
        // this to add_task, not list_tasks.
        let intent = parser().parse("add task to list my pending items");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "add_task");
        assert_eq!(invocation.arguments["title"], "List My Pending Items");
    }

    #[test]
    fn test_list_defaults_to_all() {
        let intent = parser().parse("show my tasks");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "list_tasks");
        assert_eq!(invocation.arguments["status"], "all");
    }

    #[test]
    fn test_list_infers_pending_and_completed() {
        let pending = parser().parse("view my pending tasks");
        assert_eq!(pending.invocation.unwrap().arguments["status"], "pending");

        let completed = parser().parse("list finished tasks");
        assert_eq!(
            completed.invocation.unwrap().arguments["status"],
            "completed"
        );
    }

    #[test]
    fn test_complete_task_extracts_id() {
        let intent = parser().parse("mark task 2 as done");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "complete_task");
        assert_eq!(invocation.arguments["task_id"], 2);
    }

    #[test]
    fn test_delete_task_extracts_id() {
        let intent = parser().parse("please remove task #14");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "delete_task");
        assert_eq!(invocation.arguments["task_id"], 14);
    }

    #[test]
    fn test_update_task_extracts_id_and_title() {
        let intent = parser().parse("rename task 3 to call mom");
        let invocation = intent.invocation.unwrap();
        assert_eq!(invocation.name, "update_task");
        assert_eq!(invocation.arguments["task_id"], 3);
        assert_eq!(invocation.arguments["title"], "Call Mom");
    }

    #[test]
    fn test_unrecognized_input_lists_usable_phrasings() {
        let intent = parser().parse("quux the frobnicator");
        assert_eq!(tool_name(&intent), "");
        assert!(intent.reply.contains("'add task [title]'"));
        assert!(intent.reply.contains("'show my tasks'"));
    }
}
