use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Abstraction over how progress and outcome lines are emitted while working
/// through a bank.
///
/// Methods are grouped into verbosity tiers: errors and verdicts (tier 1),
/// per-repository outcomes (tier 2), per-method detail (tier 3), and raw
/// subprocess output (tier 4). Implementations decide which tiers to render.
pub trait Output: Send + Sync {
    /// Print a fatal or per-repository error. Tier 1.
    fn error(&self, msg: &str) -> io::Result<()>;
    /// Print the final batch verdict, styled by success. Tier 1.
    fn verdict(&self, success: bool, msg: &str) -> io::Result<()>;
    /// Print a per-repository success line. Tier 2.
    fn ok(&self, msg: &str) -> io::Result<()>;
    /// Print a per-repository warning line. Tier 2.
    fn warn(&self, msg: &str) -> io::Result<()>;
    /// Print a per-repository failure line. Tier 2.
    fn fail(&self, msg: &str) -> io::Result<()>;
    /// Print an unstyled informational message. Tier 2.
    fn message(&self, msg: &str) -> io::Result<()>;
    /// Print per-method resolution detail. Tier 3.
    fn detail(&self, msg: &str) -> io::Result<()>;
    /// Print raw subprocess output. Tier 4.
    fn trace(&self, msg: &str) -> io::Result<()>;
    /// Flush any buffered output.
    fn finish(&self) -> io::Result<()>;
}

/// Output implementation that suppresses everything. Useful for tests and
/// embedding callers that render summaries themselves.
pub struct Quiet;

impl Output for Quiet {
    fn error(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn verdict(&self, _success: bool, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn ok(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn warn(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn fail(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn message(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn detail(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn trace(&self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn finish(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Color-capable terminal renderer gated by a verbosity level from 1
/// (minimal feedback) to 4 (full feedback).
pub struct Terminal {
    /// Whether to emit ANSI colors.
    color_choice: ColorChoice,
    /// Highest tier that is rendered.
    verbosity: u8,
}

impl Terminal {
    /// Create a new terminal output.
    ///
    /// - `color`: when `true`, always render colored output; when `false`,
    ///   disable ANSI colors.
    /// - `verbosity`: feedback level, 1 to 4.
    pub fn new(color: bool, verbosity: u8) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            verbosity,
        }
    }

    /// Write one line, optionally colored, when `tier` is within the
    /// configured verbosity.
    fn write_line(&self, tier: u8, msg: &str, color: Option<Color>) -> io::Result<()> {
        if self.verbosity < tier {
            return Ok(());
        }
        let mut stdout = StandardStream::stdout(self.color_choice);
        if let Some(color) = color {
            stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        }
        writeln!(stdout, "{msg}")?;
        stdout.reset()?;
        stdout.flush()?;
        Ok(())
    }
}

impl Output for Terminal {
    fn error(&self, msg: &str) -> io::Result<()> {
        self.write_line(1, msg, Some(Color::Red))
    }

    fn verdict(&self, success: bool, msg: &str) -> io::Result<()> {
        let color = if success { Color::Green } else { Color::Red };
        self.write_line(1, msg, Some(color))
    }

    fn ok(&self, msg: &str) -> io::Result<()> {
        self.write_line(2, msg, Some(Color::Green))
    }

    fn warn(&self, msg: &str) -> io::Result<()> {
        self.write_line(2, msg, Some(Color::Yellow))
    }

    fn fail(&self, msg: &str) -> io::Result<()> {
        self.write_line(2, msg, Some(Color::Red))
    }

    fn message(&self, msg: &str) -> io::Result<()> {
        self.write_line(2, msg, None)
    }

    fn detail(&self, msg: &str) -> io::Result<()> {
        self.write_line(3, msg, None)
    }

    fn trace(&self, msg: &str) -> io::Result<()> {
        self.write_line(4, msg, None)
    }

    fn finish(&self) -> io::Result<()> {
        io::stdout().flush()
    }
}
