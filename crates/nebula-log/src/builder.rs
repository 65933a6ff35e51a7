//! Logger builder implementation

// Standard library
use std::sync::Arc;

// External dependencies
use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Internal crates
use crate::{LogResult, config::*, writer};

/// Logger builder
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger alive
pub struct LoggerGuard {
    #[allow(dead_code)]
    inner: Option<Arc<Inner>>,
}

struct Inner {
    reload_handle: Option<ReloadHandle>,
    _root_span_guard: Option<tracing::span::EnteredSpan>,
}

/// Handle for runtime configuration changes
#[derive(Clone)]
pub struct ReloadHandle {
    filter: tracing_subscriber::reload::Handle<EnvFilter, Registry>,
    current_filter: Arc<Mutex<String>>,
}

impl LoggerBuilder {
    /// Create builder from config
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and initialize the logger
    pub fn build(self) -> LogResult<LoggerGuard> {
        let mut inner = Inner { reload_handle: None, _root_span_guard: None };

        let filter = EnvFilter::try_new(&self.config.level)
            .map_err(|e| crate::Error::Filter(e.to_string()))?;

        let writer = writer::make_writer(&self.config.writer)?;

        match (self.config.reloadable, self.config.format) {
            (true, Format::Pretty) => self.build_reloadable_pretty(filter, writer, &mut inner),
            (true, Format::Compact | Format::Logfmt) => {
                self.build_reloadable_compact(filter, writer, &mut inner)
            }
            (true, Format::Json) => self.build_reloadable_json(filter, writer, &mut inner),
            (false, Format::Pretty) => self.build_static_pretty(filter, writer),
            (false, Format::Compact | Format::Logfmt) => self.build_static_compact(filter, writer),
            (false, Format::Json) => self.build_static_json(filter, writer),
        }

        if !self.config.fields.is_empty() {
            let root = tracing::info_span!(
                "app",
                service = self.config.fields.service.as_deref().unwrap_or(""),
                env = self.config.fields.env.as_deref().unwrap_or(""),
                version = self.config.fields.version.as_deref().unwrap_or(""),
                instance = self.config.fields.instance.as_deref().unwrap_or(""),
                region = self.config.fields.region.as_deref().unwrap_or("")
            );
            inner._root_span_guard = Some(root.entered());
        }

        Ok(LoggerGuard { inner: Some(Arc::new(inner)) })
    }

    fn timer(&self) -> tracing_subscriber::fmt::time::SystemTime {
        crate::format::make_timer(if self.config.display.time {
            self.config.display.time_format.as_deref()
        } else {
            None
        })
    }

    // Reloadable variants

    fn build_reloadable_pretty(
        &self,
        filter: EnvFilter,
        writer: tracing_subscriber::fmt::writer::BoxMakeWriter,
        inner: &mut Inner,
    ) {
        let (layer, handle) = tracing_subscriber::reload::Layer::new(filter);
        inner.reload_handle = Some(ReloadHandle {
            filter: handle,
            current_filter: Arc::new(Mutex::new(self.config.level.clone())),
        });

        Registry::default()
            .with(layer)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }

    fn build_reloadable_compact(
        &self,
        filter: EnvFilter,
        writer: tracing_subscriber::fmt::writer::BoxMakeWriter,
        inner: &mut Inner,
    ) {
        let (layer, handle) = tracing_subscriber::reload::Layer::new(filter);
        inner.reload_handle = Some(ReloadHandle {
            filter: handle,
            current_filter: Arc::new(Mutex::new(self.config.level.clone())),
        });

        Registry::default()
            .with(layer)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }

    fn build_reloadable_json(
        &self,
        filter: EnvFilter,
        writer: tracing_subscriber::fmt::writer::BoxMakeWriter,
        inner: &mut Inner,
    ) {
        let (layer, handle) = tracing_subscriber::reload::Layer::new(filter);
        inner.reload_handle = Some(ReloadHandle {
            filter: handle,
            current_filter: Arc::new(Mutex::new(self.config.level.clone())),
        });

        Registry::default()
            .with(layer)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(self.config.display.span_list)
                    .flatten_event(self.config.display.flatten)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }

    // Static (non-reloadable) variants

    fn build_static_pretty(&self, filter: EnvFilter, writer: tracing_subscriber::fmt::writer::BoxMakeWriter) {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }

    fn build_static_compact(&self, filter: EnvFilter, writer: tracing_subscriber::fmt::writer::BoxMakeWriter) {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }

    fn build_static_json(&self, filter: EnvFilter, writer: tracing_subscriber::fmt::writer::BoxMakeWriter) {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(self.config.display.span_list)
                    .flatten_event(self.config.display.flatten)
                    .with_ansi(self.config.display.colors)
                    .with_target(self.config.display.target)
                    .with_file(self.config.display.source)
                    .with_line_number(self.config.display.source)
                    .with_thread_ids(self.config.display.thread_ids)
                    .with_thread_names(self.config.display.thread_names)
                    .with_timer(self.timer()),
            )
            .init();
    }
}

impl ReloadHandle {
    /// Reload the log filter
    pub fn reload(&self, filter: &str) -> LogResult<()> {
        let new_filter =
            EnvFilter::try_new(filter).map_err(|e| crate::Error::Filter(e.to_string()))?;
        self.filter
            .reload(new_filter)
            .map_err(|e| crate::Error::Config(format!("failed to reload filter: {e}")))?;
        *self.current_filter.lock() = filter.to_string();
        Ok(())
    }

    /// Get current filter string
    pub fn current_filter(&self) -> String {
        self.current_filter.lock().clone()
    }
}

impl LoggerGuard {
    #[cfg(test)]
    pub(crate) fn noop() -> Self {
        Self { inner: None }
    }
}
