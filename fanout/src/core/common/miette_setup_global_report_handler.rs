// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Global [miette](https://docs.rs/miette/latest/miette/index.html) report handler for
//! the `fanout` binary.
//!
//! The hook is lazy: it only runs when a [`miette::Report`] is about to be displayed by
//! the top-level `main() -> miette::Result<_>`, so the terminal width is measured at
//! that moment and never otherwise.

use miette::MietteHandlerOpts;

use crate::get_terminal_width;

/// Fallback width when stdout is not a terminal.
const DEFAULT_REPORT_WIDTH: usize = 80;

pub fn setup_default_miette_global_report_handler(issues_url: &'static str) {
    miette::set_hook(Box::new(|_report| {
        let terminal_width = {
            let it = get_terminal_width().map_or(DEFAULT_REPORT_WIDTH, usize::from);
            tracing::debug!(message = "miette::set_hook", terminal_width = it);
            it
        };
        Box::new(
            MietteHandlerOpts::new()
                .width(terminal_width)
                .wrap_lines(true)
                .unicode(true)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .with_cause_chain()
                .footer(issues_url.to_string())
                .build(),
        )
    }))
    .ok();
}
