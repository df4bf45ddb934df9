use std::collections::HashMap;
use std::io::IsTerminal;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, util::SubscriberInitExt, Layer};

use crate::config::{LoggingConfig, Section};
use crate::paths::resolve_log_path;

// Keep the non-blocking console guard alive for the process lifetime.
static CONSOLE_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// target == crate_name, or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

// ---- rotating file writers ----

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

#[derive(Clone)]
struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut w) => w.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut w) => w.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// A writer handle that may be absent (drops writes).
#[derive(Clone)]
struct RoutedWriterHandle(Option<RotWriterHandle>);

impl Write for RoutedWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, with a fallback
/// writer from the "default" section.
#[derive(Clone)]
struct MultiFileRouter {
    default: Option<RotWriter>,
    by_prefix: HashMap<String, RotWriter>,
}

impl MultiFileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriterHandle> {
        for (crate_name, wr) in &self.by_prefix {
            if matches_crate_prefix(target, crate_name) {
                return Some(RotWriterHandle(wr.0.clone()));
            }
        }
        self.default.as_ref().map(|w| RotWriterHandle(w.0.clone()))
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for MultiFileRouter {
    type Writer = RoutedWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriterHandle(self.default.as_ref().map(|w| RotWriterHandle(w.0.clone())))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriterHandle(self.resolve_for(meta.target()))
    }
}

// ---- config extraction ----

struct ConfigData<'a> {
    default_section: Option<&'a Section>,
    crate_sections: Vec<(String, &'a Section)>,
}

fn extract_config_data(cfg: &LoggingConfig) -> ConfigData<'_> {
    let crate_sections = cfg
        .iter()
        .filter(|(k, _)| k.as_str() != "default")
        .map(|(k, v)| (k.clone(), v))
        .collect::<Vec<_>>();
    ConfigData {
        default_section: cfg.get("default"),
        crate_sections,
    }
}

fn create_rotating_writer(section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = log_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("cannot create log directory {}: {e}", parent.display());
            return None;
        }
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) as usize * 1024 * 1024;
    // Prefer a file-count limit when configured, else age-based retention.
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            section.max_age_days.unwrap_or(1) as i64
        )),
    };

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Some(RotWriter(Arc::new(Mutex::new(rot))))
}

fn build_file_router(config: &ConfigData, base_dir: &Path) -> MultiFileRouter {
    let mut router = MultiFileRouter {
        default: None,
        by_prefix: HashMap::new(),
    };
    if let Some(section) = config.default_section {
        router.default = create_rotating_writer(section, base_dir);
    }
    for (crate_name, section) in &config.crate_sections {
        if let Some(writer) = create_rotating_writer(section, base_dir) {
            router.by_prefix.insert(crate_name.clone(), writer);
        }
    }
    router
}

// ---- targets ----

enum SinkKind {
    Console,
    File { has_default_file: bool },
}

fn build_targets(config: &ConfigData, kind: SinkKind) -> Targets {
    match kind {
        SinkKind::Console => {
            let default_level = config
                .default_section
                .and_then(|s| parse_tracing_level(&s.console_level))
                .map(LevelFilter::from_level)
                .unwrap_or(LevelFilter::INFO);
            let mut targets = Targets::new().with_default(default_level);
            for (crate_name, section) in &config.crate_sections {
                if let Some(level) =
                    parse_tracing_level(&section.console_level).map(LevelFilter::from_level)
                {
                    targets = targets.with_target(crate_name.clone(), level);
                }
            }
            targets
        }
        SinkKind::File { has_default_file } => {
            let default_level = config
                .default_section
                .and_then(|s| parse_tracing_level(&s.file_level))
                .map(LevelFilter::from_level)
                .unwrap_or(if has_default_file {
                    LevelFilter::INFO
                } else {
                    LevelFilter::OFF
                });
            let mut targets = Targets::new().with_default(default_level);
            for (crate_name, section) in &config.crate_sections {
                if section.file.trim().is_empty() {
                    continue;
                }
                if let Some(level) =
                    parse_tracing_level(&section.file_level).map(LevelFilter::from_level)
                {
                    targets = targets.with_target(crate_name.clone(), level);
                }
            }
            targets
        }
    }
}

// ---- init ----

/// Install the global subscriber: console layer plus JSON file layers
/// routed per subsystem. `RUST_LOG` acts as an upper bound when set.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` records into tracing before the subscriber exists.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let data = extract_config_data(cfg);
    if data.default_section.is_none() && data.crate_sections.is_empty() {
        init_minimal();
        return;
    }

    let file_router = build_file_router(&data, base_dir);
    let console_targets = build_targets(&data, SinkKind::Console);
    let file_targets = build_targets(
        &data,
        SinkKind::File {
            has_default_file: file_router.default.is_some(),
        },
    );

    install_subscriber(console_targets, file_targets, file_router);
}

fn install_subscriber(console_targets: Targets, file_targets: Targets, router: MultiFileRouter) {
    use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

    let env: Option<EnvFilter> = EnvFilter::try_from_default_env().ok();

    let (nb_stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(nb_stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets);

    let file_layer = if router.is_empty() {
        None
    } else {
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router)
                .with_filter(file_targets),
        )
    };

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn init_minimal() {
    use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

    let env = EnvFilter::try_from_default_env().ok();
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let _ = Registry::default().with(env).with(fmt_layer).try_init();
}
