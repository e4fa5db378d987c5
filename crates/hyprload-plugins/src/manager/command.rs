/// A dispatcher command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stage and load built plugins.
    Load,
    /// Unload plugins and drop the session.
    Clear,
    /// Clear, then load.
    Reload,
    /// Build every required plugin.
    Install,
    /// Refresh and rebuild stale plugins.
    Update,
    /// Toggle the status overlay.
    Overlay,
    /// Anything else, verbatim.
    Unknown(String),
}

impl Command {
    /// Parses a dispatcher argument. Surrounding whitespace is ignored.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "load" => Self::Load,
            "clear" => Self::Clear,
            "reload" => Self::Reload,
            "install" => Self::Install,
            "update" => Self::Update,
            "overlay" => Self::Overlay,
            other => Self::Unknown(other.to_owned()),
        }
    }
}
