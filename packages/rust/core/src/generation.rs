//! Generation collaborator.
//!
//! The [`Generator`] trait is the only seam between the workflow and whatever
//! produces candidate artifacts. [`BridgeGenerator`] drives a subprocess over a
//! JSON-lines stdin/stdout protocol; tests plug in a scripted generator.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use draftwright_shared::{
    BridgeConfig, DraftwrightError, GenerationOptions, Language, OutlineSection, ParentRef,
    Payload, Result, Stage, WritingStyle,
};

use crate::assembler::Part;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Input for generating the candidate options of one stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub stage: Stage,
    pub language: Language,
    /// Upstream selections the stage depends on.
    pub context: Value,
    /// The parent the resulting set will be recorded under.
    pub parent: ParentRef,
}

/// Input for generating one of the three article parts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRequest {
    pub part: Part,
    pub sections: Vec<OutlineSection>,
    /// Tokens the text should carry where each image belongs, one per image.
    pub placeholders: Vec<String>,
    pub images: Vec<String>,
    pub ctas: Vec<String>,
    pub title: String,
    pub sapo: String,
    pub persona_summary: String,
    pub analysis_summary: String,
    pub language: Language,
    pub style: WritingStyle,
    pub options: GenerationOptions,
}

/// Produces candidate artifacts and article text.
///
/// `None` means the collaborator had no usable result. Callers report it and
/// leave the workspace untouched.
#[allow(async_fn_in_trait)]
pub trait Generator {
    async fn generate_options(&mut self, request: &StageRequest) -> Option<Vec<Payload>>;
    async fn generate_part(&mut self, request: &PartRequest) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Bridge protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
enum Task<'a> {
    Options(&'a StageRequest),
    Part(&'a PartRequest),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Generate {
        id: String,
        model: &'a str,
        task: Task<'a>,
    },
    Shutdown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Result { id: String, result: BridgeResult },
    Error {
        #[allow(dead_code)]
        id: String,
        error: String,
    },
}

/// Raw model output plus usage accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeResult {
    pub text: String,
    #[serde(default)]
    pub tokens_in: u64,
    #[serde(default)]
    pub tokens_out: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Bridge generator
// ---------------------------------------------------------------------------

/// [`Generator`] backed by the bridge subprocess.
pub struct BridgeGenerator {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    model: String,
    request_counter: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl BridgeGenerator {
    /// Spawn the bridge and wait for its ready handshake.
    pub fn spawn(config: &BridgeConfig) -> Result<Self> {
        info!(cmd = %config.cmd, script = %config.script, "spawning generation bridge");

        let mut command = Command::new(&config.cmd);
        command
            .arg("run")
            .arg(&config.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if !config.working_dir.is_empty() {
            command.current_dir(&config.working_dir);
        }

        let mut child = command.spawn().map_err(|e| {
            DraftwrightError::Generation(format!(
                "failed to spawn bridge: {e}. Is `{}` installed?",
                config.cmd
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DraftwrightError::Generation("failed to capture bridge stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DraftwrightError::Generation("failed to capture bridge stdout".into()))?;

        let mut bridge = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            model: config.model.clone(),
            request_counter: 0,
            tokens_in: 0,
            tokens_out: 0,
        };
        bridge.wait_for_ready()?;
        Ok(bridge)
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| DraftwrightError::Generation(format!("bridge read error: {e}")))?;
        if line.is_empty() {
            return Err(DraftwrightError::Generation(
                "bridge closed stdout unexpectedly".into(),
            ));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            let shown: String = line.chars().take(200).collect();
            DraftwrightError::Generation(format!("invalid bridge message: {e} (got: {shown})"))
        })
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            ResponseMessage::Ready => {
                info!("bridge is ready");
                Ok(())
            }
            other => Err(DraftwrightError::Generation(format!(
                "expected ready message, got {other:?}"
            ))),
        }
    }

    fn send(&mut self, task: Task<'_>) -> Result<BridgeResult> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);
        let request = RequestMessage::Generate {
            id: id.clone(),
            model: &self.model,
            task,
        };
        let json = serde_json::to_string(&request).map_err(|e| {
            DraftwrightError::Generation(format!("failed to serialize request: {e}"))
        })?;

        writeln!(self.stdin, "{json}")
            .and_then(|_| self.stdin.flush())
            .map_err(|e| DraftwrightError::Generation(format!("failed to write to bridge: {e}")))?;

        match self.read_message()? {
            ResponseMessage::Result { id: resp_id, result } => {
                if resp_id != id {
                    return Err(DraftwrightError::Generation(format!(
                        "response id {resp_id} does not match request {id}"
                    )));
                }
                self.tokens_in += result.tokens_in;
                self.tokens_out += result.tokens_out;
                debug!(%id, latency_ms = result.latency_ms, "bridge result");
                Ok(result)
            }
            ResponseMessage::Error { error, .. } => Err(DraftwrightError::Generation(error)),
            ResponseMessage::Ready => Err(DraftwrightError::Generation(
                "unexpected ready message during generation".into(),
            )),
        }
    }

    /// Ask the bridge to exit and reap it.
    pub fn shutdown(mut self) {
        if let Ok(json) = serde_json::to_string(&RequestMessage::Shutdown) {
            let _ = writeln!(self.stdin, "{json}");
            let _ = self.stdin.flush();
        }
        match self.child.wait() {
            Ok(status) => info!(
                ?status,
                tokens_in = self.tokens_in,
                tokens_out = self.tokens_out,
                "bridge exited"
            ),
            Err(e) => warn!("bridge wait error: {e}"),
        }
    }
}

impl Generator for BridgeGenerator {
    #[instrument(skip_all, fields(stage = %request.stage))]
    async fn generate_options(&mut self, request: &StageRequest) -> Option<Vec<Payload>> {
        let result = match self.send(Task::Options(request)) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "stage generation failed");
                return None;
            }
        };
        let Some(value) = extract_json(&result.text) else {
            warn!("no JSON found in model response");
            return None;
        };
        parse_options(request.stage, value)
    }

    #[instrument(skip_all, fields(part = %request.part))]
    async fn generate_part(&mut self, request: &PartRequest) -> Option<String> {
        match self.send(Task::Part(request)) {
            Ok(result) => {
                let text = draftwright_markdown::tidy_generated(&result.text);
                if text.trim().is_empty() {
                    warn!("model returned empty text");
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                warn!(error = %e, "part generation failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Pull a JSON value out of free-form model text: a fenced block first,
/// otherwise the span from the first opening bracket to the last closing one.
pub fn extract_json(text: &str) -> Option<Value> {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"));

    let fenced = FENCE_RE
        .captures(text)
        .and_then(|caps| serde_json::from_str(caps[1].trim()).ok());
    if fenced.is_some() {
        return fenced;
    }

    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Keys under which models tend to wrap option lists.
const LIST_KEYS: [&str; 10] = [
    "options",
    "items",
    "keywords",
    "objectives",
    "titles",
    "descriptions",
    "sapos",
    "ctas",
    "images",
    "results",
];

/// Map a parsed response onto payloads of `stage`. Items that do not fit are
/// skipped; a response with nothing usable is `None`.
pub fn parse_options(stage: Stage, value: Value) -> Option<Vec<Payload>> {
    let items = match (stage, value) {
        (Stage::Outline, Value::Array(sections)) => {
            vec![serde_json::json!({ "sections": sections })]
        }
        (Stage::Outline, Value::Object(mut map)) => match map.remove("outline") {
            Some(Value::Array(sections)) => vec![serde_json::json!({ "sections": sections })],
            Some(other) => vec![other],
            None => vec![Value::Object(map)],
        },
        (_, Value::Array(items)) => items,
        (_, Value::Object(mut map)) => {
            match LIST_KEYS.iter().find_map(|k| match map.get(*k) {
                Some(Value::Array(_)) => Some(*k),
                _ => None,
            }) {
                Some(key) => match map.remove(key) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                None => vec![Value::Object(map)],
            }
        }
        (_, other) => vec![other],
    };

    let total = items.len();
    let payloads: Vec<Payload> = items
        .into_iter()
        .filter_map(|item| match Payload::from_value(stage, promote_string(stage, item)) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!(error = %e, "skipping unparseable option");
                None
            }
        })
        .collect();

    if total > 0 && payloads.is_empty() {
        warn!(%stage, total, "no option matched the payload shape");
        return None;
    }
    Some(payloads)
}

/// Bare strings become the stage's main text field.
fn promote_string(stage: Stage, item: Value) -> Value {
    let Value::String(text) = item else {
        return item;
    };
    let field = match stage {
        Stage::Keywords => "term",
        Stage::Objectives | Stage::MetaDescriptions => "description",
        Stage::Titles => "title",
        Stage::Sapo | Stage::Cta => "content",
        Stage::Persona | Stage::Analysis => "summary",
        Stage::Images => "url",
        Stage::Product => "name",
        Stage::Outline | Stage::Article => return Value::String(text),
    };
    serde_json::json!({ field: text })
}

// ---------------------------------------------------------------------------
// Scripted generator (tests)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
