// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{BridgeShared, CompletionSnapshot, complete_line};
use rustyline::{Context, Helper, completion::Completer, highlight::Highlighter,
                hint::Hinter, validate::Validator};
use std::{borrow::Cow, sync::Arc};

/// Completion and password masking for the line editor.
#[derive(Debug)]
pub struct FanoutLineHelper {
    pub completion: CompletionSnapshot,
    pub shared: Arc<BridgeShared>,
}

impl Completer for FanoutLineHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(complete_line(line, pos, &self.completion.lock()))
    }
}

impl Hinter for FanoutLineHelper {
    type Hint = String;
}

impl Highlighter for FanoutLineHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if BridgeShared::flag(&self.shared.masked) {
            Cow::Owned("*".repeat(line.chars().count()))
        } else {
            Cow::Borrowed(line)
        }
    }

    /// Every keystroke has to redraw the mask.
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        BridgeShared::flag(&self.shared.masked)
    }
}

impl Validator for FanoutLineHelper {}

impl Helper for FanoutLineHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompletionData;

    #[test]
    fn test_masking_follows_the_shared_flag() {
        let (_tx, rx) = std::sync::mpsc::channel();
        let helper = FanoutLineHelper {
            completion: CompletionSnapshot::new(CompletionData::default()),
            shared: Arc::new(BridgeShared::new(rx)),
        };
        assert_eq!(helper.highlight("hunter2", 7), "hunter2");
        assert!(!helper.highlight_char("hunter2", 7, false));

        BridgeShared::set(&helper.shared.masked, true);
        assert_eq!(helper.highlight("hunter2", 7), "*******");
        assert!(helper.highlight_char("hunter2", 7, false));
    }
}
