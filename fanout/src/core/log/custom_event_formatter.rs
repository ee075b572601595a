// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Single line, plain text event format for trace log files.
//!
//! ```text
//! 10:21:07.114 DEBUG reactor: session readable ◆ session=SessionId(3) bytes=212
//! ```

use chrono::Local;
use std::fmt::{self, Write as _};
use tracing::{Event, Subscriber,
              field::{Field, Visit}};
use tracing_subscriber::{fmt::{FmtContext, FormatEvent, FormatFields,
                               format::Writer},
                         registry::LookupSpan};

/// Separates the heading (message) from the key-value body.
pub const BODY_SEPARATOR: &str = " ◆ ";

/// Formats every event on one line: time, level, target, `message`, then the other
/// fields as `key=value`.
///
/// The way `fanout` uses tracing is formalized: every call has a `message` field that
/// forms the heading, plus zero or more fields that form the body.
///
/// ```
/// tracing::debug!(message = "session readable", bytes = 212);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomEventFormatter;

impl<S, N> FormatEvent<S, N> for CustomEventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut f: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        write!(f, "{timestamp} {:>5} {}: ", metadata.level(), metadata.target())?;

        let mut visitor = VisitEventAndCollectFields::default();
        event.record(&mut visitor);

        f.write_str(&visitor.heading)?;
        if !visitor.body.is_empty() {
            f.write_str(BODY_SEPARATOR)?;
            f.write_str(&visitor.body)?;
        }
        writeln!(f)
    }
}

/// Splits the fields of an event into the `message` heading and a `key=value` body.
#[derive(Debug, Default)]
pub struct VisitEventAndCollectFields {
    pub heading: String,
    pub body: String,
}

impl VisitEventAndCollectFields {
    fn push(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if field.name() == "message" {
            write!(self.heading, "{value}").ok();
        } else {
            if !self.body.is_empty() {
                self.body.push(' ');
            }
            write!(self.body, "{}={value}", field.name()).ok();
        }
    }
}

impl Visit for VisitEventAndCollectFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format_args!("{value:?}"));
    }

    /// Strings use [`std::fmt::Display`] so newlines and quotes in values are not
    /// escaped.
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, format_args!("{value}"));
    }
}
