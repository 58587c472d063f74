/// Captured program output
///
/// Everything the `write*` instructions print is appended here; the CLI
/// copies it to stdout after the run.
#[derive(Debug, Clone, Default)]
pub struct Terminal {
    text: String,
}

impl Terminal {
    pub fn new() -> Self {
        Terminal {
            text: String::new(),
        }
    }

    /// Print without newline
    pub fn print(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn newline(&mut self) {
        self.text.push('\n');
    }

    /// Raw output
    pub fn output(&self) -> &str {
        &self.text
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        let mut result: Vec<String> = self.text.split('\n').map(|s| s.to_string()).collect();
        // Remove trailing empty string if text ended with newline
        if result.last().is_some_and(|s| s.is_empty()) {
            result.pop();
        }
        result
    }
}
