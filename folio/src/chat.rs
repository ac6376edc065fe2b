//! Line-oriented chat loop for `folio chat`.
//!
//! Each input line is either a slash action (`/walk`, `/review`, `/edit`,
//! `/export`, `/quit`) or a reply handed to the session. Lines that start with
//! `/` but name no action, such as `/projects/alpha`, are replies too. New
//! system messages are written to the output as they are produced.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::types::{CollectedRecord, FieldSchema, Sender};
use crate::io::store::SnapshotStore;
use crate::session::{ChatSession, DEFAULT_EXPORT_FILE};

/// A parsed chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Walk,
    Review,
    Edit {
        subject_id: i64,
        field: String,
        value: Option<String>,
    },
    Export(Option<PathBuf>),
    Quit,
    Reply(String),
}

impl ChatAction {
    /// Parse one input line. A malformed known action yields a usage message;
    /// any other line, slash-prefixed or not, is a reply.
    pub fn parse(line: &str) -> Result<ChatAction, String> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(ChatAction::Reply(line.to_string()));
        };
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default().trim();
        match name {
            "walk" => Ok(ChatAction::Walk),
            "review" => Ok(ChatAction::Review),
            "quit" | "exit" => Ok(ChatAction::Quit),
            "export" => Ok(ChatAction::Export(
                (!args.is_empty()).then(|| PathBuf::from(args)),
            )),
            "edit" => parse_edit(args),
            _ => Ok(ChatAction::Reply(line.to_string())),
        }
    }
}

fn parse_edit(args: &str) -> Result<ChatAction, String> {
    const USAGE: &str = "usage: /edit <subject-id> <field> [value]";
    let mut parts = args.splitn(3, char::is_whitespace);
    let subject_id = parts
        .next()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| USAGE.to_string())?;
    let field = parts
        .next()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| USAGE.to_string())?
        .to_string();
    let value = parts
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    Ok(ChatAction::Edit {
        subject_id,
        field,
        value,
    })
}

/// Drive the session from `input` until EOF or `/quit`.
///
/// Relative export paths resolve against `root`.
pub fn run_chat<S, R, W>(
    session: &mut ChatSession<S>,
    root: &Path,
    input: R,
    output: &mut W,
) -> Result<()>
where
    S: SnapshotStore,
    R: BufRead,
    W: Write,
{
    let mut shown = session.messages().len();
    if let Some(greeting) = session.greet() {
        writeln!(output, "bot> {}", greeting.text)?;
        shown = session.messages().len();
    }

    for line in input.lines() {
        let line = line.context("read chat input")?;
        let action = match ChatAction::parse(&line) {
            Ok(action) => action,
            Err(message) => {
                writeln!(output, "!! {message}")?;
                continue;
            }
        };
        match action {
            ChatAction::Quit => break,
            ChatAction::Walk => {
                session.start_walk();
            }
            ChatAction::Reply(text) => {
                session.send(&text);
            }
            ChatAction::Review => {
                let review = render_review(session.records(), session.engine().schema());
                write!(output, "{review}")?;
            }
            ChatAction::Edit {
                subject_id,
                field,
                value,
            } => match session.edit(subject_id, &field, value.as_deref()) {
                Ok(()) => writeln!(output, "ok> updated {field} for subject {subject_id}")?,
                Err(err) => writeln!(output, "!! {err}")?,
            },
            ChatAction::Export(path) => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));
                let path = if path.is_absolute() {
                    path
                } else {
                    root.join(path)
                };
                match session.export_to(&path) {
                    Ok(()) => writeln!(output, "ok> exported to {}", path.display())?,
                    Err(err) => writeln!(output, "!! export failed: {err:#}")?,
                }
            }
        }

        for message in &session.messages()[shown..] {
            if message.sender == Sender::System {
                writeln!(output, "bot> {}", message.text)?;
            }
        }
        shown = session.messages().len();
    }

    if session.is_memory_only() {
        writeln!(
            output,
            "!! could not save chat data; it was kept in memory for this session only"
        )?;
    }
    output.flush()?;
    Ok(())
}

/// Human-readable listing of collected records, schema fields first.
pub fn render_review(records: &[CollectedRecord], schema: &FieldSchema) -> String {
    if records.is_empty() {
        return "No project data collected yet.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "[{}] {}", record.subject_id, record.title);
        for field in schema.names() {
            let value = record.field(field).unwrap_or("(not provided)");
            let _ = writeln!(out, "  {field}: {value}");
        }
        for (field, value) in &record.fields {
            if !schema.contains(field) {
                let _ = writeln!(out, "  {field}: {value}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::core::types::Subject;
    use crate::io::store::MemoryStore;

    fn session() -> ChatSession<MemoryStore> {
        ChatSession::open(
            MemoryStore::new(),
            FieldSchema::new(["role", "link"]),
            vec![Subject::new(1, "Alpha")],
        )
    }

    fn run(session: &mut ChatSession<MemoryStore>, root: &Path, script: &str) -> String {
        let mut out = Vec::new();
        run_chat(session, root, Cursor::new(script.to_string()), &mut out).expect("chat");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn parse_actions() {
        assert_eq!(ChatAction::parse("/walk"), Ok(ChatAction::Walk));
        assert_eq!(ChatAction::parse(" /quit "), Ok(ChatAction::Quit));
        assert_eq!(ChatAction::parse("/export"), Ok(ChatAction::Export(None)));
        assert_eq!(
            ChatAction::parse("/export out.json"),
            Ok(ChatAction::Export(Some(PathBuf::from("out.json"))))
        );
        assert_eq!(
            ChatAction::parse("/edit 3 link https://x.dev"),
            Ok(ChatAction::Edit {
                subject_id: 3,
                field: "link".to_string(),
                value: Some("https://x.dev".to_string()),
            })
        );
        assert_eq!(
            ChatAction::parse("/edit 3 link"),
            Ok(ChatAction::Edit {
                subject_id: 3,
                field: "link".to_string(),
                value: None,
            })
        );
        assert!(ChatAction::parse("/edit x link").is_err());
        assert_eq!(
            ChatAction::parse("/projects/alpha"),
            Ok(ChatAction::Reply("/projects/alpha".to_string()))
        );
        assert_eq!(
            ChatAction::parse("hello"),
            Ok(ChatAction::Reply("hello".to_string()))
        );
    }

    #[test]
    fn scripted_walk_prints_prompts_and_completion() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session();
        let out = run(&mut session, temp.path(), "yes\nEngineer\nskip\n/review\n");

        assert!(out.starts_with("bot> Hi,"));
        assert!(out.contains("Please provide the role for \"Alpha\""));
        assert!(out.contains("Please provide the link for \"Alpha\""));
        assert!(out.contains("All done!"));
        assert!(out.contains("[1] Alpha\n  role: Engineer\n  link: (not provided)\n"));
    }

    #[test]
    fn quit_stops_reading() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session();
        run(&mut session, temp.path(), "/quit\nyes\n");
        assert!(!session.state().is_active());
    }

    #[test]
    fn export_writes_snapshot_relative_to_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session();
        let out = run(&mut session, temp.path(), "/walk\nEngineer\nhttp://a\n/export\n");

        let path = temp.path().join(DEFAULT_EXPORT_FILE);
        assert!(out.contains("ok> exported to"));
        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json");
        assert_eq!(exported["records"][0]["link"], "http://a");
        assert!(exported["messages"].as_array().expect("messages").len() > 3);
    }

    #[test]
    fn slash_prefixed_answer_is_recorded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session();
        let out = run(&mut session, temp.path(), "yes\nEngineer\n/projects/alpha\n");

        assert!(!out.contains("!!"), "{out}");
        assert!(out.contains("All done!"));
        assert!(!session.state().is_active());
        assert_eq!(session.records()[0].field("link"), Some("/projects/alpha"));
    }

    #[test]
    fn failed_export_is_reported_and_chat_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("afile"), "").expect("write");
        let mut session = session();
        let out = run(&mut session, temp.path(), "/export afile/x.json\nyes\n");

        assert!(out.contains("!! export failed:"), "{out}");
        assert!(session.state().is_active());
    }

    #[test]
    fn edit_during_walk_is_reported_inline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session();
        let out = run(&mut session, temp.path(), "/walk\n/edit 1 role Lead\n");
        assert!(out.contains("!! records cannot be edited while a walk is in progress"));
    }

    #[test]
    fn review_lists_extra_fields_after_schema_fields() {
        let mut record = CollectedRecord::for_subject(&Subject::new(4, "Delta"));
        record.fields.insert("summary".to_string(), "fast".to_string());
        let out = render_review(&[record], &FieldSchema::new(["role"]));
        assert_eq!(out, "[4] Delta\n  role: (not provided)\n  summary: fast\n");
    }
}
