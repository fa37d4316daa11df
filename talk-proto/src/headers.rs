//! Identity and access headers attached to every call.

/// Header carrying the client's user agent.
pub const USER_AGENT: &str = "User-Agent";
/// Header identifying the desktop application flavour.
pub const APPLICATION: &str = "X-Line-Application";
/// Header carrying the verifier during login and the auth token afterwards.
pub const ACCESS: &str = "X-Line-Access";

/// Desktop flavour the client announces itself as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Mac,
    Windows,
}

impl Platform {
    pub fn os_version(self) -> &'static str {
        match self {
            Self::Mac     => "10.9.4-MAVERICKS-x64",
            Self::Windows => "5.1.2600-XP-x64",
        }
    }
}

/// The header set shared by the RPC channel and the HTTP helper.
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelHeaders {
    pub user_agent:  String,
    pub application: String,
    pub access:      Option<String>,
}

impl ChannelHeaders {
    /// Identity headers for `platform` at application `version`, without access.
    pub fn new(platform: Platform, version: &str) -> Self {
        let os = platform.os_version();
        let (user_agent, application) = match platform {
            Platform::Mac => (
                format!("DESKTOP:MAC:{os}({version})"),
                format!("DESKTOPMAC\t{version}\tMAC\t{os}"),
            ),
            Platform::Windows => (
                format!("DESKTOP:WIN:{os}({version})"),
                format!("DESKTOPWIN\t{version}\tWINDOWS\t{os}"),
            ),
        };
        Self { user_agent, application, access: None }
    }

    /// Copy of these headers carrying `access`.
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self { access: Some(access.into()), ..self.clone() }
    }

    /// Name/value pairs in send order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![(USER_AGENT, self.user_agent.as_str()), (APPLICATION, self.application.as_str())];
        if let Some(a) = &self.access {
            out.push((ACCESS, a.as_str()));
        }
        out
    }
}

impl std::fmt::Debug for ChannelHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHeaders")
            .field("user_agent", &self.user_agent)
            .field("application", &self.application)
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
