// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::LaunchConfig;

/// Options that sessions read on every event and that control commands may change.
/// Owned by the reactor, lent to sessions through [`crate::SessionEnv`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub interactive: bool,
    pub password: Option<String>,
    pub abort_errors: bool,
    /// Debug flag given to new sessions.
    pub debug: bool,
    pub use_color: bool,
    /// Command run by every new session in non-interactive mode.
    pub command: Option<String>,
    /// Highest exit code of any remote shell so far.
    pub exit_code: i32,
    pub(crate) exit_request: Option<i32>,
}

impl RuntimeOptions {
    #[must_use]
    pub fn from_launch_config(config: &LaunchConfig) -> Self {
        Self {
            interactive: config.interactive,
            password: config.password.clone(),
            abort_errors: config.abort_errors,
            debug: config.debug,
            use_color: config.use_color,
            command: config.command.clone(),
            exit_code: 0,
            exit_request: None,
        }
    }

    pub fn fold_exit_code(&mut self, code: i32) { self.exit_code = self.exit_code.max(code); }

    /// Asks the reactor to exit with `code` at the end of the current event. The first
    /// request wins.
    pub fn request_exit(&mut self, code: i32) { self.exit_request.get_or_insert(code); }

    pub fn take_exit_request(&mut self) -> Option<i32> { self.exit_request.take() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_requests_and_codes() {
        let mut options = RuntimeOptions::default();
        options.fold_exit_code(3);
        options.fold_exit_code(1);
        assert_eq!(options.exit_code, 3);

        options.request_exit(1);
        options.request_exit(0);
        assert_eq!(options.take_exit_request(), Some(1));
        assert_eq!(options.take_exit_request(), None);
    }
}
