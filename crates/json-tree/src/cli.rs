//! Core logic of the `json-tree` binary.
//!
//! The binary reads a JSON array (or a single object) from stdin, applies one
//! command to a [`TreeSession`] and prints the result:
//!
//! - `outline`                 indented `label [id]` view
//! - `reorder`                 depth-first re-serialized array
//! - `realign [--parent ID]`   renumber one sibling group
//! - `get NODE PATH`           print one payload field
//! - `set NODE PATH VALUE`     write one payload field (JSON, or text converted
//!   to the type of the current value)
//! - `move NODE (--into PARENT | --before SIBLING | --last [--under PARENT])`
//! - `delete NODE`
//!
//! Key roles come from `--id` (default `id`), `--children`, `--depth`,
//! `--label`, or `--flat` for positional ids. `--no-realign` turns off
//! realignment after `move`.

use serde_json::Value;

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::keys::{SessionOptions, TreeKeys};
use crate::reparent::DropTarget;
use crate::session::TreeSession;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CliError {
    Json(serde_json::Error),
    Tree(TreeError),
    Usage(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Json(e) => write!(f, "invalid JSON: {e}"),
            CliError::Tree(e) => write!(f, "{e}"),
            CliError::Usage(e) => write!(f, "usage: {e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<TreeError> for CliError {
    fn from(e: TreeError) -> Self {
        CliError::Tree(e)
    }
}

fn usage(message: impl Into<String>) -> CliError {
    CliError::Usage(message.into())
}

// ── Arguments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Outline,
    Reorder,
    Realign { parent: Option<String> },
    Get { node: String, path: String },
    Set { node: String, path: String, value: String },
    Move { node: String, target: DropTarget },
    Delete { node: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub keys: TreeKeys,
    pub options: SessionOptions,
}

/// Parses the arguments that follow the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let mut keys = TreeKeys::new("id");
    let mut options = SessionOptions::default();
    let mut positional: Vec<&str> = Vec::new();
    let mut parent = None;
    let mut into = None;
    let mut before = None;
    let mut under = None;
    let mut last = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| usage(format!("{flag} needs a value")))
        };
        match arg.as_str() {
            "--id" => keys.identifier_key = Some(value("--id")?),
            "--flat" => keys.identifier_key = None,
            "--children" => keys.children_key = Some(value("--children")?),
            "--depth" => keys.depth_key = Some(value("--depth")?),
            "--label" => keys.label_key = Some(value("--label")?),
            "--no-realign" => options.auto_realign = false,
            "--parent" => parent = Some(value("--parent")?),
            "--into" => into = Some(value("--into")?),
            "--before" => before = Some(value("--before")?),
            "--under" => under = Some(value("--under")?),
            "--last" => last = true,
            flag if flag.starts_with("--") => return Err(usage(format!("unknown flag {flag}"))),
            other => positional.push(other),
        }
    }

    let Some((name, rest)) = positional.split_first() else {
        return Err(usage("json-tree <outline|reorder|realign|get|set|move|delete> ..."));
    };
    let arg = |i: usize, what: &str| {
        rest.get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| usage(format!("{name} needs {what}")))
    };
    let command = match *name {
        "outline" => Command::Outline,
        "reorder" => Command::Reorder,
        "realign" => Command::Realign { parent },
        "get" => Command::Get {
            node: arg(0, "a node id")?,
            path: arg(1, "a path")?,
        },
        "set" => Command::Set {
            node: arg(0, "a node id")?,
            path: arg(1, "a path")?,
            value: arg(2, "a value")?,
        },
        "move" => {
            let target = match (into, before, last) {
                (Some(parent), None, false) => DropTarget::into_parent(parent),
                (None, Some(sibling), false) => DropTarget::before(sibling),
                (None, None, true) => DropTarget::last_under(under.map(Identifier::Text)),
                _ => return Err(usage("move needs exactly one of --into, --before or --last")),
            };
            Command::Move {
                node: arg(0, "a node id")?,
                target,
            }
        }
        "delete" => Command::Delete {
            node: arg(0, "a node id")?,
        },
        other => return Err(usage(format!("unknown command {other}"))),
    };
    Ok(Invocation { command, keys, options })
}

// ── Commands ──────────────────────────────────────────────────────────────

/// Runs one invocation against the JSON text `input`.
///
/// Returns the text to print on stdout.
pub fn run(invocation: &Invocation, input: &str) -> Result<String, CliError> {
    let data: Value = serde_json::from_str(input)?;
    let mut session = TreeSession::from_value(data, invocation.keys.clone())?.with_options(invocation.options);

    match &invocation.command {
        Command::Outline => return Ok(outline(&session)),
        Command::Reorder => session.reorder(),
        Command::Realign { parent } => {
            let renamed = session.realign(parent.as_deref())?;
            tracing::info!(renamed, "realign finished");
        }
        Command::Get { node, path } => {
            return Ok(serde_json::to_string_pretty(session.get_field(node, path)?)?);
        }
        Command::Set { node, path, value } => match serde_json::from_str::<Value>(value) {
            Ok(parsed) => {
                session.set_field(node, path, parsed)?;
            }
            Err(_) => {
                session.set_field_text(node, path, value)?;
            }
        },
        Command::Move { node, target } => {
            let outcome = session.move_node(node, target)?;
            tracing::info!(node = %outcome.node, renamed = outcome.renamed.len(), "move finished");
        }
        Command::Delete { node } => {
            if session.delete_node(node) == 0 {
                return Err(TreeError::unknown(node).into());
            }
        }
    }
    Ok(serde_json::to_string_pretty(&Value::Array(session.into_raw_array()))?)
}

/// Renders the tree as one `label [id]` line per node, indented two spaces
/// per level.
pub fn outline(session: &TreeSession) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&String, usize)> = session.roots().iter().rev().map(|r| (r, 0)).collect();
    while let Some((key, level)) = stack.pop() {
        let label = session.label_of(key).unwrap_or_default();
        out.push_str(&"  ".repeat(level));
        if label == *key {
            out.push_str(key);
        } else {
            out.push_str(&format!("{label} [{key}]"));
        }
        out.push('\n');
        stack.extend(session.children(key).iter().rev().map(|c| (c, level + 1)));
    }
    out
}
