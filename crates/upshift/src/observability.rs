//! Structured JSON logging.
//!
//! stdout carries command output (tags, changelog sections, JSON reports), so
//! log records only ever go to a file or, failing that, stderr.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::Event;
use tracing::field::{Field, Visit};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "UPSHIFT_LOG_PATH";
const ENV_LOG_DIR: &str = "UPSHIFT_LOG_DIR";
const LOG_FILE_NAME: &str = "upshift.jsonl";

/// Where log records should go, before environment overrides are applied.
#[derive(Clone, Debug, Default)]
pub struct ObservabilityConfig {
    /// `log_dir` from the configuration file.
    pub log_dir: Option<Utf8PathBuf>,
}

impl ObservabilityConfig {
    /// Use the configured log directory, if any.
    pub fn from_config_dir(log_dir: Option<&Utf8Path>) -> Self {
        Self {
            log_dir: log_dir.map(Utf8Path::to_path_buf),
        }
    }
}

/// A resolved log file.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogFile {
    dir: Utf8PathBuf,
    name: String,
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Install the global subscriber.
///
/// Falls back to stderr when no log file can be opened.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (writer, guard) = match resolve_log_file(cfg.log_dir.as_deref()) {
        Ok(file) => {
            let appender = tracing_appender::rolling::daily(&file.dir, &file.name);
            tracing_appender::non_blocking(appender)
        }
        Err(err) => {
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonLogLayer { writer })
        .try_init()?;

    tracing::debug!("observability initialized");
    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` from CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

// ============================================================================
// Log file resolution
// ============================================================================

fn resolve_log_file(config_dir: Option<&Utf8Path>) -> Result<LogFile, String> {
    let path = std::env::var(ENV_LOG_PATH).ok().map(Utf8PathBuf::from);
    let dir = std::env::var(ENV_LOG_DIR).ok().map(Utf8PathBuf::from);
    resolve_log_file_with(
        path,
        dir,
        config_dir.map(Utf8Path::to_path_buf),
        upshift_core::config::user_data_dir().map(|d| d.join("logs")),
    )
}

fn resolve_log_file_with(
    path_override: Option<Utf8PathBuf>,
    dir_override: Option<Utf8PathBuf>,
    config_dir: Option<Utf8PathBuf>,
    data_dir: Option<Utf8PathBuf>,
) -> Result<LogFile, String> {
    if let Some(path) = path_override {
        let name = path
            .file_name()
            .ok_or_else(|| format!("{ENV_LOG_PATH} must include a file name"))?
            .to_string();
        let dir = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);
        return open_log_file(dir, name);
    }

    let dir = dir_override
        .or(config_dir)
        .or(data_dir)
        .ok_or_else(|| "no log directory available".to_string())?;
    open_log_file(dir, LOG_FILE_NAME.to_string())
}

fn open_log_file(dir: Utf8PathBuf, name: String) -> Result<LogFile, String> {
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("failed to create log directory {dir}: {e}"))?;
    let path = dir.join(&name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("failed to open log file {path}: {e}"))?;
    Ok(LogFile { dir, name })
}

// ============================================================================
// JSON layer
// ============================================================================

struct JsonLogLayer<W> {
    writer: W,
}

#[derive(Clone, Debug)]
struct SpanFields(Map<String, Value>);

impl<S, W> tracing_subscriber::Layer<S> for JsonLogLayer<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut visitor = JsonVisitor::default();
            attrs.record(&mut visitor);
            span.extensions_mut().insert(SpanFields(visitor.0));
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            let mut extensions = span.extensions_mut();
            if let Some(fields) = extensions.get_mut::<SpanFields>() {
                fields.0.extend(visitor.0);
            } else {
                extensions.insert(SpanFields(visitor.0));
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        let mut map = Map::new();
        map.insert("timestamp".into(), Value::String(timestamp()));
        map.insert("level".into(), Value::String(meta.level().as_str().to_lowercase()));
        map.insert("target".into(), Value::String(meta.target().to_string()));

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    map.extend(fields.0.clone());
                }
            }
        }

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        map.extend(visitor.0);

        let mut writer = self.writer.make_writer();
        if serde_json::to_writer(&mut writer, &Value::Object(map)).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

#[derive(Default)]
struct JsonVisitor(Map<String, Value>);

impl JsonVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(number));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
fn timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        now.subsec_millis()
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
const fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i64 + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
        (tmp, dir)
    }

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins() {
        let (_tmp, dir) = scratch();
        let file = resolve_log_file_with(
            Some(dir.join("custom.jsonl")),
            Some(dir.join("ignored")),
            None,
            None,
        )
        .unwrap();
        assert_eq!(file, LogFile { dir, name: "custom.jsonl".into() });
    }

    #[test]
    fn config_dir_beats_data_dir() {
        let (_tmp, dir) = scratch();
        let file = resolve_log_file_with(
            None,
            None,
            Some(dir.join("from-config")),
            Some(dir.join("data")),
        )
        .unwrap();
        assert_eq!(file.dir, dir.join("from-config"));
        assert_eq!(file.name, LOG_FILE_NAME);
        assert!(file.dir.join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn nothing_available_is_an_error() {
        assert!(resolve_log_file_with(None, None, None, None).is_err());
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 24, "{ts}");
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
        assert_eq!(civil_from_days(20_742), (2026, 10, 16));
    }
}
