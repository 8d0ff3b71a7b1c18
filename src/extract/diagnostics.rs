/// Ordered debug and error messages collected during one extraction.
///
/// Messages are also forwarded to the `log` facade as they are recorded,
/// but formatting them for display is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    debug: Vec<String>,
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug_messages(&self) -> &[String] {
        &self.debug
    }

    pub fn error_messages(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.debug.is_empty() && self.errors.is_empty()
    }

    pub(crate) fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{message}");
        self.debug.push(message);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.errors.push(message);
    }

    /// Debug messages, each wrapped in `open` and `close`.
    ///
    /// ```
    /// use zipguard::Diagnostics;
    ///
    /// let diagnostics = Diagnostics::new();
    /// assert_eq!(diagnostics.debug_string("<p>", "</p>"), "");
    /// ```
    pub fn debug_string(&self, open: &str, close: &str) -> String {
        wrap(&self.debug, open, close)
    }

    /// Error messages, each wrapped in `open` and `close`.
    pub fn error_string(&self, open: &str, close: &str) -> String {
        wrap(&self.errors, open, close)
    }
}

fn wrap(messages: &[String], open: &str, close: &str) -> String {
    messages
        .iter()
        .map(|m| format!("{open}{m}{close}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_are_independent_and_ordered() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.debug("first");
        diagnostics.error("broken");
        diagnostics.debug("second");

        assert_eq!(diagnostics.debug_messages(), ["first", "second"]);
        assert_eq!(diagnostics.error_messages(), ["broken"]);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_wrapped_strings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.debug("Creating folder: out/a");
        diagnostics.debug("Extracted: out/a/b.txt");
        diagnostics.error("ZIP archive is empty");

        assert_eq!(
            diagnostics.debug_string("<p>", "</p>"),
            "<p>Creating folder: out/a</p><p>Extracted: out/a/b.txt</p>"
        );
        assert_eq!(
            diagnostics.error_string("- ", "\n"),
            "- ZIP archive is empty\n"
        );
    }
}
