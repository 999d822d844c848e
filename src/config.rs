use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("wordpress-xmlrpc/", env!("CARGO_PKG_VERSION"));

/// Character encoding of request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// ISO-8859-1, the historical baseline of the protocol. Characters outside
    /// the range are written as character references.
    #[default]
    Latin1,
    Utf8,
}

impl Encoding {
    /// Name used in the XML declaration.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Utf8 => "UTF-8",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub encoding: Encoding,
    /// Applied to connect, write and read. `None` waits forever.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            encoding: Encoding::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            system_proxy: true,
        }
    }
}

impl Config {
    pub fn encoding(mut self, encoding: Encoding) -> Config {
        self.encoding = encoding;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Config {
        self.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Config {
        self.user_agent = user_agent.into();
        self
    }

    pub fn system_proxy(mut self, enabled: bool) -> Config {
        self.system_proxy = enabled;
        self
    }
}
