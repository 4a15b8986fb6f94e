//! Form submissions for route actions.
//!
//! Mirrors the reply shape of a client-side form library: a submission either
//! succeeds with a typed value, fails with per-field messages, or is not a real
//! submit (e.g. live validation) and is echoed back untouched.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Meta field carrying the submission intent. Absent means a regular submit.
pub const SUBMISSION_INTENT_FIELD: &str = "__intent__";

pub const DELETE_NOTE_INTENT: &str = "delete-note";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SubmissionStatus {
    Error,
}

/// SubmissionReply
///
/// Sent back to the form for re-rendering: the submitted values and, on failure,
/// the messages keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmissionReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    pub initial_value: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub error: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// ActionReply
///
/// Envelope of every JSON reply an action produces for the form (`{"result": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActionReply {
    pub result: SubmissionReply,
}

/// Outcome of parsing a submission against a form schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    Success(T),
    /// Validation failed; reply with 400 and field errors.
    Error(SubmissionReply),
    /// Not a submit; reply with 200 and the submission unchanged.
    Idle(SubmissionReply),
}

/// DeleteNoteForm
///
/// `intent=delete-note&noteId=<uuid>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeleteNoteForm {
    #[schema(example = "delete-note")]
    pub intent: String,
    /// Taken as submitted; resolving it to a note is the action's job.
    #[serde(rename = "noteId")]
    pub note_id: String,
}

fn initial_value(fields: &HashMap<String, String>) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != SUBMISSION_INTENT_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// parse_delete_note
///
/// Validates a delete submission: `intent` must be the literal `delete-note` and
/// `noteId` must be present and non-blank.
pub fn parse_delete_note(fields: &HashMap<String, String>) -> Submission<DeleteNoteForm> {
    let initial_value = initial_value(fields);

    match fields.get(SUBMISSION_INTENT_FIELD) {
        Some(intent) if intent != "submit" => {
            return Submission::Idle(SubmissionReply {
                status: None,
                initial_value,
                error: BTreeMap::new(),
                intent: Some(intent.clone()),
            });
        }
        _ => {}
    }

    let mut error: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let intent = fields.get("intent").map(|s| s.trim()).unwrap_or_default();
    if intent != DELETE_NOTE_INTENT {
        error.insert(
            "intent".to_string(),
            vec![format!("Invalid literal value, expected \"{DELETE_NOTE_INTENT}\"")],
        );
    }

    let note_id = match fields.get("noteId").map(|s| s.trim()) {
        None | Some("") => {
            error.insert("noteId".to_string(), vec!["Required".to_string()]);
            None
        }
        Some(raw) => Some(raw.to_string()),
    };

    match note_id {
        Some(note_id) if error.is_empty() => Submission::Success(DeleteNoteForm {
            intent: DELETE_NOTE_INTENT.to_string(),
            note_id,
        }),
        _ => Submission::Error(SubmissionReply {
            status: Some(SubmissionStatus::Error),
            initial_value,
            error,
            intent: None,
        }),
    }
}
