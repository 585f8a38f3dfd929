use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checkpoint value for a source that has never delivered an event.
pub const NEVER_SENT: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// The two families of knowledge source. Each family gets its own
/// extraction worker and its own backing-store reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    IssueTracker,
    SourceControl,
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFamily::IssueTracker => write!(f, "issue-tracker"),
            SourceFamily::SourceControl => write!(f, "source-control"),
        }
    }
}

/// Concrete source type, as named in the sources configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "bg")]
    Bugzilla,
    Jira,
    Github,
    Git,
    Svn,
}

impl SourceKind {
    pub fn family(self) -> SourceFamily {
        match self {
            SourceKind::Bugzilla | SourceKind::Jira | SourceKind::Github => {
                SourceFamily::IssueTracker
            }
            SourceKind::Git | SourceKind::Svn => SourceFamily::SourceControl,
        }
    }

    /// Backend name understood by the mining tools.
    pub fn backend(self) -> &'static str {
        match self {
            SourceKind::Bugzilla => "bg",
            SourceKind::Jira => "jira",
            SourceKind::Github => "github",
            SourceKind::Git => "git",
            SourceKind::Svn => "svn",
        }
    }

    /// Whether the mining tool needs a local working copy.
    pub fn needs_working_copy(self) -> bool {
        matches!(self, SourceKind::Git)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            SourceKind::Bugzilla => "bugzilla",
            SourceKind::Jira => "jira",
            SourceKind::Github => "github",
            SourceKind::Git => "git",
            SourceKind::Svn => "svn",
        })
    }
}

/// What the pipeline does with a source when it is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    /// Run the mining command only; no events are generated.
    #[serde(alias = "extract-only", alias = "extract_only")]
    Extract,
    /// Skip mining and publish what the backing store already holds.
    #[serde(alias = "publish-only", alias = "publish_only")]
    Publish,
    #[default]
    #[serde(alias = "extract-and-publish", alias = "extract_and_publish")]
    Both,
}

impl StartupMode {
    pub fn extracts(self) -> bool {
        matches!(self, StartupMode::Extract | StartupMode::Both)
    }

    pub fn publishes(self) -> bool {
        matches!(self, StartupMode::Publish | StartupMode::Both)
    }
}

impl std::fmt::Display for StartupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            StartupMode::Extract => "extract",
            StartupMode::Publish => "publish",
            StartupMode::Both => "both",
        })
    }
}

/// Login for the remote tracker or repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// An external project data source to be mined.
///
/// The descriptor is immutable once registered. The checkpoint lives
/// next to it in the registry, not in this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Opaque identity, also used as the working-copy directory name.
    pub id: String,
    /// Locator (URI). Unique across the registry.
    pub uri: String,
    pub kind: SourceKind,
    pub startup: StartupMode,
    pub credentials: Option<Credentials>,
}

impl KnowledgeSource {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            kind,
            startup: StartupMode::default(),
            credentials: None,
        }
    }

    pub fn with_startup(mut self, startup: StartupMode) -> Self {
        self.startup = startup;
        self
    }

    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    pub fn locator(&self) -> &str {
        &self.uri
    }

    pub fn family(&self) -> SourceFamily {
        self.kind.family()
    }
}
