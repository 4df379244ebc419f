use std::io::{self, BufRead, Write};

/// Line-oriented questions on a reader/writer pair (stdin/stdout in the app).
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks for one line. Empty input falls back to `default`.
    ///
    /// Returns `None` once the input is exhausted.
    pub fn ask(&mut self, message: &str, default: Option<&str>) -> io::Result<Option<String>> {
        match default {
            Some(value) if !value.is_empty() => write!(self.output, "{message} [{value}]: ")?,
            _ => write!(self.output, "{message}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(Some(default.unwrap_or_default().to_string()));
        }
        Ok(Some(answer.to_string()))
    }

    /// Yes/no question defaulting to no.
    pub fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{message} [y/N]"), None)?;
        Ok(matches!(
            answer.as_deref().map(str::to_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}
