//! Utility functions for CLI operations.

use std::io::{self, Write};

use anyhow::Result;

/// Write output to stdout and flush, so streamed lines appear immediately
pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Explain a failed backend call with the settings involved.
pub fn backend_hint(base_url: &str) -> String {
    format!(
        "\n\nPossible causes:\n  \
        - The backend may not be running at {}\n  \
        - The session credential may be missing or expired (set NEUROGLOVE_TOKEN)\n\n\
        Tip: Run 'neuroglove config show' to check the active settings",
        base_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_hint_mentions_url() {
        let hint = backend_hint("http://localhost:8001");
        assert!(hint.contains("http://localhost:8001"));
        assert!(hint.contains("NEUROGLOVE_TOKEN"));
    }
}
