//! Guided walk over subjects × fields.
//!
//! The engine is a strict finite-state walk: states are `(subject, field)`
//! pairs plus `Inactive`, and the only transition is "advance one field, or one
//! subject, or terminate", driven by reply arrival. Free-text handling while
//! inactive sits beside the walk and never moves it.

use thiserror::Error;
use tracing::debug;

use crate::core::command::Command;
use crate::core::matcher::match_subject;
use crate::core::types::{
    CollectedRecord, FieldSchema, Message, SUMMARY_FIELD, Sender, Snapshot, Subject, WalkState,
};

const GREETING: &str = "Hi, I can help you document your projects. Want me to ask about each \
                        project I found in your portfolio? (yes/no)";
const NO_SUBJECTS: &str = "No projects found automatically. You can add them manually.";
const NO_FIELDS: &str = "No project fields are configured, so there is nothing to ask about.";
const COMPLETED: &str =
    "All done! You can review the collected project data and export it.";
const DECLINED: &str = "Okay, you can still type project details manually.";
const NOTED: &str = "Thanks, I've noted that. Type 'yes' to let me walk through your projects.";

/// Rejected review-time edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("records cannot be edited while a walk is in progress")]
    WalkInProgress,
    #[error("no collected record for subject {0}")]
    UnknownSubject(i64),
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Result of a single reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Walk position after the reply was applied.
    pub state: WalkState,
    /// Last system message emitted in response, if any.
    pub reply: Option<Message>,
}

/// Owns the walk position, collected records, and transcript.
#[derive(Debug, Clone)]
pub struct GuidedWalkEngine {
    schema: FieldSchema,
    /// Subjects of the current (or last) walk; also the catalog for free-text
    /// matching and affirmative restarts.
    subjects: Vec<Subject>,
    state: WalkState,
    records: Vec<CollectedRecord>,
    messages: Vec<Message>,
    next_seq: u64,
}

impl GuidedWalkEngine {
    pub fn new(schema: FieldSchema, subjects: Vec<Subject>) -> Self {
        Self {
            schema,
            subjects,
            state: WalkState::Inactive,
            records: Vec::new(),
            messages: Vec::new(),
            next_seq: 1,
        }
    }

    /// Rebuild an inactive engine from a persisted snapshot.
    ///
    /// The walk position is not part of a snapshot, so a restored engine always
    /// starts inactive.
    pub fn restore(schema: FieldSchema, subjects: Vec<Subject>, snapshot: Snapshot) -> Self {
        let next_seq = snapshot.messages.len() as u64 + 1;
        Self {
            schema,
            subjects,
            state: WalkState::Inactive,
            records: snapshot.records,
            messages: snapshot.messages,
            next_seq,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn records(&self) -> &[CollectedRecord] {
        &self.records
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Subject and field the next reply will be recorded against.
    pub fn pending(&self) -> Option<(&Subject, &str)> {
        match self.state {
            WalkState::Inactive => None,
            WalkState::Active { subject, field } => {
                Some((&self.subjects[subject], self.schema.get(field)?))
            }
        }
    }

    /// Open the conversation. No-op unless the transcript is empty.
    pub fn greet(&mut self) -> Option<Message> {
        if !self.messages.is_empty() {
            return None;
        }
        Some(self.push(Sender::System, GREETING))
    }

    /// Begin a walk over `subjects`, discarding any walk in progress together
    /// with every collected record.
    ///
    /// An empty subject list only emits an informational message: the state
    /// stays inactive and existing records are kept.
    pub fn start(&mut self, subjects: Vec<Subject>) -> WalkState {
        if subjects.is_empty() {
            self.push(Sender::System, NO_SUBJECTS);
            return self.state;
        }
        self.subjects = subjects;
        if self.schema.is_empty() {
            self.push(Sender::System, NO_FIELDS);
            return self.state;
        }

        if self.state.is_active() {
            debug!(
                discarded_records = self.records.len(),
                "restarting walk in progress"
            );
        }
        self.records.clear();
        self.state = WalkState::Active {
            subject: 0,
            field: 0,
        };

        let announcement = format!(
            "Great, I'll walk through {} project(s). For each I'll ask about: {}. \
             Type skip to leave a field empty.",
            self.subjects.len(),
            self.schema.names().join(", ")
        );
        self.push(Sender::System, &announcement);
        let prompt = field_prompt(&self.schema.names()[0], &self.subjects[0].title);
        self.push(Sender::System, &prompt);
        debug!(subjects = self.subjects.len(), fields = self.schema.len(), "walk started");
        self.state
    }

    /// Apply one user reply.
    ///
    /// While active the reply fills the pending field (`skip` leaves it absent)
    /// and the walk advances. While inactive the reply is handled as free text.
    /// Blank input is ignored entirely.
    pub fn submit_reply(&mut self, text: &str) -> Turn {
        let Some(command) = Command::parse(text) else {
            return Turn {
                state: self.state,
                reply: None,
            };
        };
        let trimmed = text.trim();
        self.push(Sender::User, trimmed);

        let reply = match self.state {
            WalkState::Inactive => self.route_free_text(command, trimmed),
            WalkState::Active { subject, field } => {
                let answer = (command != Command::Skip).then(|| trimmed.to_string());
                Some(self.record_answer(subject, field, answer))
            }
        };
        Turn {
            state: self.state,
            reply,
        }
    }

    /// Handle a message typed outside the walk.
    ///
    /// While a walk is active the text is routed through
    /// [`submit_reply`](Self::submit_reply) instead, so title matching can never
    /// write into an in-progress walk.
    pub fn handle_free_text(&mut self, text: &str) -> Option<Message> {
        self.submit_reply(text).reply
    }

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            messages: self.messages.clone(),
            records: self.records.clone(),
        }
    }

    /// Overwrite or clear one field of a collected record during review.
    ///
    /// A blank or `None` value makes the field absent.
    pub fn edit_record(
        &mut self,
        subject_id: i64,
        field: &str,
        value: Option<&str>,
    ) -> Result<(), ReviewError> {
        if self.state.is_active() {
            return Err(ReviewError::WalkInProgress);
        }
        let record = self
            .records
            .iter_mut()
            .find(|record| record.subject_id == subject_id)
            .ok_or(ReviewError::UnknownSubject(subject_id))?;
        if !self.schema.contains(field) && !record.fields.contains_key(field) {
            return Err(ReviewError::UnknownField(field.to_string()));
        }

        match value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                record.fields.insert(field.to_string(), value.to_string());
            }
            None => {
                record.fields.remove(field);
            }
        }
        Ok(())
    }

    fn record_answer(&mut self, subject: usize, field: usize, answer: Option<String>) -> Message {
        let current = self.subjects[subject].clone();
        let field_name = self.schema.names()[field].clone();
        let record = self.record_entry(&current);
        match answer {
            Some(answer) => {
                record.fields.insert(field_name, answer);
            }
            None => debug!(subject_id = current.id, field = %field_name, "field skipped"),
        }
        self.advance(subject, field)
    }

    fn advance(&mut self, subject: usize, field: usize) -> Message {
        if field < self.schema.last_index() {
            let next = field + 1;
            self.state = WalkState::Active {
                subject,
                field: next,
            };
            let prompt = field_prompt(&self.schema.names()[next], &self.subjects[subject].title);
            return self.push(Sender::System, &prompt);
        }

        let next = subject + 1;
        if next < self.subjects.len() {
            self.state = WalkState::Active {
                subject: next,
                field: 0,
            };
            let prompt = format!(
                "Next project: \"{}\". Please provide the {} (or type skip).",
                self.subjects[next].title,
                self.schema.names()[0]
            );
            return self.push(Sender::System, &prompt);
        }

        self.state = WalkState::Inactive;
        debug!(records = self.records.len(), "walk completed");
        self.push(Sender::System, COMPLETED)
    }

    fn route_free_text(&mut self, command: Command, text: &str) -> Option<Message> {
        match command {
            Command::Start => {
                self.start(self.subjects.clone());
                self.messages.last().cloned()
            }
            Command::Decline => Some(self.push(Sender::System, DECLINED)),
            Command::Skip | Command::Text(_) => Some(self.match_free_text(text)),
        }
    }

    fn match_free_text(&mut self, text: &str) -> Message {
        let Some(index) = match_subject(&self.subjects, text) else {
            return self.push(Sender::System, NOTED);
        };
        let subject = self.subjects[index].clone();
        let record = self.record_entry(&subject);
        let reply = if record.fields.contains_key(SUMMARY_FIELD) {
            format!(
                "I matched that to \"{}\", but it already has a summary, so I kept the existing \
                 one. Edit it during review to change it.",
                subject.title
            )
        } else {
            record
                .fields
                .insert(SUMMARY_FIELD.to_string(), text.to_string());
            format!(
                "Thanks, I matched that to \"{}\" and saved it as the project's summary.",
                subject.title
            )
        };
        self.push(Sender::System, &reply)
    }

    fn record_entry(&mut self, subject: &Subject) -> &mut CollectedRecord {
        let index = match self
            .records
            .iter()
            .position(|record| record.subject_id == subject.id)
        {
            Some(index) => index,
            None => {
                self.records.push(CollectedRecord::for_subject(subject));
                self.records.len() - 1
            }
        };
        &mut self.records[index]
    }

    fn push(&mut self, sender: Sender, text: &str) -> Message {
        let message = Message {
            id: format!("msg-{}", self.next_seq),
            sender,
            text: text.to_string(),
        };
        self.next_seq += 1;
        self.messages.push(message.clone());
        message
    }
}

fn field_prompt(field: &str, title: &str) -> String {
    format!("Please provide the {field} for \"{title}\" (or type skip).")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_beta() -> Vec<Subject> {
        vec![Subject::new(1, "Alpha"), Subject::new(2, "Beta")]
    }

    fn role_link() -> FieldSchema {
        FieldSchema::new(["role", "link"])
    }

    fn system_count(engine: &GuidedWalkEngine) -> usize {
        engine
            .messages()
            .iter()
            .filter(|message| message.sender == Sender::System)
            .count()
    }

    #[test]
    fn walk_example_alpha_beta() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());

        let state = engine.start(alpha_beta());
        assert_eq!(
            state,
            WalkState::Active {
                subject: 0,
                field: 0
            }
        );
        let first = &engine.messages().last().expect("prompt").text;
        assert!(first.contains("role") && first.contains("Alpha"), "{first}");

        let turn = engine.submit_reply("Engineer");
        let reply = turn.reply.expect("reply").text;
        assert!(reply.contains("link") && reply.contains("Alpha"), "{reply}");

        let turn = engine.submit_reply("skip");
        let reply = turn.reply.expect("reply").text;
        assert!(reply.contains("role") && reply.contains("Beta"), "{reply}");
        let alpha = &engine.records()[0];
        assert_eq!(alpha.field("role"), Some("Engineer"));
        assert_eq!(alpha.field("link"), None);

        let turn = engine.submit_reply("Lead");
        let reply = turn.reply.expect("reply").text;
        assert!(reply.contains("link") && reply.contains("Beta"), "{reply}");

        let turn = engine.submit_reply("http://x");
        assert_eq!(turn.state, WalkState::Inactive);
        assert_eq!(turn.reply.expect("reply").text, COMPLETED);
        let beta = &engine.records()[1];
        assert_eq!(beta.field("role"), Some("Lead"));
        assert_eq!(beta.field("link"), Some("http://x"));
    }

    #[test]
    fn full_walk_populates_every_field_in_order() {
        let subjects = vec![
            Subject::new(10, "One"),
            Subject::new(20, "Two"),
            Subject::new(30, "Three"),
        ];
        let schema = FieldSchema::default();
        let mut engine = GuidedWalkEngine::new(schema.clone(), Vec::new());
        engine.start(subjects.clone());

        for subject in &subjects {
            for field in schema.names() {
                engine.submit_reply(&format!("{} {}", subject.title, field));
            }
        }

        assert!(!engine.state().is_active());
        assert_eq!(engine.records().len(), subjects.len());
        for (record, subject) in engine.records().iter().zip(&subjects) {
            assert_eq!(record.subject_id, subject.id);
            for field in schema.names() {
                let expected = format!("{} {}", subject.title, field);
                assert_eq!(record.field(field), Some(expected.as_str()));
            }
        }
    }

    #[test]
    fn skip_is_case_insensitive_and_never_stores_empty_string() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(vec![Subject::new(1, "Alpha")]);
        engine.submit_reply("  SKIP ");
        engine.submit_reply("Skip");

        let record = &engine.records()[0];
        assert!(record.fields.is_empty());
        assert!(!engine.state().is_active());
    }

    #[test]
    fn answers_are_trimmed_but_otherwise_verbatim() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(vec![Subject::new(1, "Alpha")]);
        engine.submit_reply("  Yes  ");
        engine.submit_reply("not a url");

        let record = &engine.records()[0];
        assert_eq!(record.field("role"), Some("Yes"));
        assert_eq!(record.field("link"), Some("not a url"));
    }

    #[test]
    fn start_with_no_subjects_emits_one_message_and_stays_inactive() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        let state = engine.start(Vec::new());

        assert_eq!(state, WalkState::Inactive);
        assert_eq!(engine.messages().len(), 1);
        assert_eq!(engine.messages()[0].text, NO_SUBJECTS);
        assert!(engine.records().is_empty());
    }

    #[test]
    fn start_with_empty_schema_emits_one_message_and_stays_inactive() {
        let mut engine = GuidedWalkEngine::new(FieldSchema::new(Vec::<String>::new()), Vec::new());
        let state = engine.start(alpha_beta());

        assert_eq!(state, WalkState::Inactive);
        assert_eq!(engine.messages().len(), 1);
        assert_eq!(engine.messages()[0].text, NO_FIELDS);
        assert!(engine.records().is_empty());
        assert_eq!(engine.subjects(), alpha_beta().as_slice());
        assert_eq!(engine.pending(), None);
    }

    #[test]
    fn restart_discards_partial_records() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(alpha_beta());
        engine.submit_reply("Engineer");
        engine.submit_reply("http://a");
        engine.submit_reply("Lead");
        assert_eq!(engine.records().len(), 2);

        let state = engine.start(alpha_beta());
        assert_eq!(
            state,
            WalkState::Active {
                subject: 0,
                field: 0
            }
        );
        assert!(engine.records().is_empty());
    }

    #[test]
    fn blank_reply_is_ignored() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(alpha_beta());
        let before = engine.messages().len();

        let turn = engine.submit_reply("   ");
        assert_eq!(turn.reply, None);
        assert_eq!(
            turn.state,
            WalkState::Active {
                subject: 0,
                field: 0
            }
        );
        assert_eq!(engine.messages().len(), before);
    }

    #[test]
    fn free_text_title_sets_summary_without_starting_walk() {
        let mut engine = GuidedWalkEngine::new(FieldSchema::default(), alpha_beta());

        let reply = engine
            .handle_free_text("Beta was a fun project")
            .expect("reply");
        assert!(reply.text.contains("Beta"));
        assert!(!engine.state().is_active());
        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.records()[0].subject_id, 2);
        assert_eq!(
            engine.records()[0].field(SUMMARY_FIELD),
            Some("Beta was a fun project")
        );
    }

    #[test]
    fn free_text_keeps_existing_summary() {
        let mut engine = GuidedWalkEngine::new(FieldSchema::default(), alpha_beta());
        engine.handle_free_text("alpha first");
        let reply = engine.handle_free_text("alpha second").expect("reply");

        assert!(reply.text.contains("kept the existing"));
        assert_eq!(engine.records()[0].field(SUMMARY_FIELD), Some("alpha first"));
    }

    #[test]
    fn unmatched_free_text_is_acknowledged() {
        let mut engine = GuidedWalkEngine::new(FieldSchema::default(), alpha_beta());
        let reply = engine.handle_free_text("hello").expect("reply");
        assert_eq!(reply.text, NOTED);
        assert!(engine.records().is_empty());
    }

    #[test]
    fn affirmative_starts_walk_over_catalog() {
        let mut engine = GuidedWalkEngine::new(role_link(), alpha_beta());
        let turn = engine.submit_reply("Y");

        assert_eq!(
            turn.state,
            WalkState::Active {
                subject: 0,
                field: 0
            }
        );
        let prompt = turn.reply.expect("prompt").text;
        assert!(prompt.contains("role") && prompt.contains("Alpha"));
    }

    #[test]
    fn decline_acknowledges_without_state_change() {
        let mut engine = GuidedWalkEngine::new(role_link(), alpha_beta());
        let turn = engine.submit_reply("no");
        assert_eq!(turn.state, WalkState::Inactive);
        assert_eq!(turn.reply.expect("reply").text, DECLINED);
    }

    #[test]
    fn title_text_during_walk_is_an_answer_not_a_match() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(alpha_beta());
        engine.handle_free_text("Beta");

        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.records()[0].subject_id, 1);
        assert_eq!(engine.records()[0].field("role"), Some("Beta"));
        assert_eq!(engine.records()[0].field(SUMMARY_FIELD), None);
    }

    #[test]
    fn greet_only_on_empty_transcript() {
        let mut engine = GuidedWalkEngine::new(role_link(), alpha_beta());
        assert!(engine.greet().is_some());
        assert!(engine.greet().is_none());
        assert_eq!(system_count(&engine), 1);
    }

    #[test]
    fn message_ids_are_unique_and_continue_after_restore() {
        let mut engine = GuidedWalkEngine::new(role_link(), alpha_beta());
        engine.greet();
        engine.submit_reply("yes");

        let snapshot = engine.export_snapshot();
        let mut restored = GuidedWalkEngine::restore(role_link(), alpha_beta(), snapshot);
        assert!(!restored.state().is_active());
        restored.submit_reply("hello");

        let mut ids: Vec<&str> = restored
            .messages()
            .iter()
            .map(|message| message.id.as_str())
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn edit_record_sets_and_clears_fields() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(vec![Subject::new(1, "Alpha")]);
        engine.submit_reply("Engineer");
        engine.submit_reply("skip");

        engine
            .edit_record(1, "link", Some("https://alpha.dev"))
            .expect("edit link");
        engine.edit_record(1, "role", Some("  ")).expect("clear role");

        let record = &engine.records()[0];
        assert_eq!(record.field("link"), Some("https://alpha.dev"));
        assert_eq!(record.field("role"), None);
    }

    #[test]
    fn edit_record_rejects_invalid_targets() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        engine.start(vec![Subject::new(1, "Alpha")]);
        assert_eq!(
            engine.edit_record(1, "role", Some("x")),
            Err(ReviewError::WalkInProgress)
        );

        engine.submit_reply("Engineer");
        engine.submit_reply("skip");
        assert_eq!(
            engine.edit_record(9, "role", Some("x")),
            Err(ReviewError::UnknownSubject(9))
        );
        assert_eq!(
            engine.edit_record(1, "colour", Some("x")),
            Err(ReviewError::UnknownField("colour".to_string()))
        );
    }

    #[test]
    fn pending_reports_current_slot() {
        let mut engine = GuidedWalkEngine::new(role_link(), Vec::new());
        assert!(engine.pending().is_none());
        engine.start(alpha_beta());
        engine.submit_reply("Engineer");

        let (subject, field) = engine.pending().expect("pending");
        assert_eq!(subject.title, "Alpha");
        assert_eq!(field, "link");
    }
}
