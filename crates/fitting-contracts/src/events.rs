use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Append-only `events.jsonl` for one fitting session.
///
/// Every line carries `type`, `session_id`, a per-session `seq` starting at 1
/// and a `ts`. Those keys are owned by the log; a field with the same name is
/// overwritten.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    session_id: String,
    sink: Mutex<Sink>,
}

#[derive(Debug)]
struct Sink {
    file: File,
    seq: u64,
}

impl EventLog {
    pub fn open(path: &Path, session_id: impl Into<String>) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self {
            inner: Arc::new(EventLogInner {
                session_id: session_id.into(),
                sink: Mutex::new(Sink { file, seq: 0 }),
            }),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn record<'a>(
        &self,
        event_type: &str,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> anyhow::Result<Value> {
        let mut event: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        let mut sink = self
            .inner
            .sink
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        sink.seq += 1;
        event.insert("type".to_string(), Value::from(event_type));
        event.insert("session_id".to_string(), Value::from(self.session_id()));
        event.insert("seq".to_string(), Value::from(sink.seq));
        event.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        sink.file
            .write_all(line.as_bytes())
            .with_context(|| format!("failed to append {event_type} event"))?;
        Ok(Value::Object(event))
    }
}
