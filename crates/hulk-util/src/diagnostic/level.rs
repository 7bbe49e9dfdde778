//! Severity levels for diagnostics.

/// How serious a [`super::Diagnostic`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// The program is rejected; checking still continues to collect more
    /// diagnostics (spec.md §7's propagation policy operates at the stage
    /// boundary, not per-error).
    Error,
    /// The program is accepted but something is suspicious.
    Warning,
    /// Supplementary information attached to another diagnostic.
    Note,
    /// A suggested fix.
    Help,
    /// An invariant internal to the checker was violated — distinct from a
    /// [`crate::error::ContextError`]/[`crate::error::ScopeError`] in that
    /// it is surfaced to the user as a diagnostic rather than propagated
    /// with `Result`.
    Bug,
}

impl Level {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Level::Error | Level::Bug)
    }

    #[inline]
    pub fn is_warning(&self) -> bool {
        matches!(self, Level::Warning)
    }

    #[inline]
    pub fn is_info(&self) -> bool {
        matches!(self, Level::Note | Level::Help)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
            Level::Help => "help",
            Level::Bug => "error: internal compiler error",
        }
    }

    /// ANSI SGR color code for terminal rendering, or `None` if the level
    /// has no associated color.
    pub fn color_code(&self) -> Option<&'static str> {
        match self {
            Level::Error => Some("31"),
            Level::Warning => Some("33"),
            Level::Note => Some("36"),
            Level::Help => Some("32"),
            Level::Bug => Some("35"),
        }
    }

    /// ANSI SGR intensity: bold for errors and bugs, normal otherwise.
    pub fn intensity(&self) -> &'static str {
        match self {
            Level::Error | Level::Bug => "1",
            _ => "0",
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            Level::Error => "E",
            Level::Warning => "W",
            Level::Note => "N",
            Level::Help => "H",
            Level::Bug => "!",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether a [`super::SourceSnippet`] label marks the primary location of a
/// diagnostic or a secondary, supporting one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

impl LabelStyle {
    pub fn underline_char(&self) -> char {
        match self {
            LabelStyle::Primary => '^',
            LabelStyle::Secondary => '-',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelStyle::Primary => "primary",
            LabelStyle::Secondary => "secondary",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, LabelStyle::Primary)
    }

    pub fn is_secondary(&self) -> bool {
        matches!(self, LabelStyle::Secondary)
    }
}

impl std::fmt::Display for LabelStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a [`Handler`](super::Handler) should colorize its terminal
/// output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorConfig {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorConfig {
    pub fn use_color(&self, is_tty: bool) -> bool {
        match self {
            ColorConfig::Auto => is_tty,
            ColorConfig::Always => true,
            ColorConfig::Never => false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, ColorConfig::Never)
    }
}
