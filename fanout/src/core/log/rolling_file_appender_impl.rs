// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::Path;

/// Creates a file appender that never rotates, writing to `path`.
///
/// # Errors
///
/// Returns an error if `path` has no parent folder or no file name.
pub fn try_create(path: &Path) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => miette::bail!(
            "Can't access the folder of {}. It might not exist, or don't have required permissions.",
            path.display()
        ),
    };

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't access file name {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_create_rejects_root() {
        assert!(try_create(Path::new("/")).is_err());
    }

    #[test]
    fn test_try_create_in_temp_dir() {
        let path = std::env::temp_dir().join(format!(
            "fanout_rolling_file_appender_{}.log",
            std::process::id()
        ));
        assert!(try_create(&path).is_ok());
        std::fs::remove_file(&path).ok();
    }
}
