use std::fmt;

/// Operating system the native toolchain runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    FreeBSD,
    Unknown(String),
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "macos" | "darwin" => Platform::MacOS,
            "windows" => Platform::Windows,
            "freebsd" => Platform::FreeBSD,
            other => Platform::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::MacOS => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
            Platform::FreeBSD => write!(f, "freebsd"),
            Platform::Unknown(os) => write!(f, "{os}"),
        }
    }
}
