use kesi_core::{Priority, Resolution, Severity, SourceKind, Status};

/// Value vocabulary of a tracker product.
///
/// The miner stores field values verbatim, so each tracker needs its own
/// mapping onto the common issue model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Bugzilla,
    Jira,
    Github,
}

impl Dialect {
    pub fn for_kind(kind: SourceKind) -> Option<Self> {
        match kind {
            SourceKind::Bugzilla => Some(Dialect::Bugzilla),
            SourceKind::Jira => Some(Dialect::Jira),
            SourceKind::Github => Some(Dialect::Github),
            SourceKind::Git | SourceKind::Svn => None,
        }
    }

    pub fn status(self, value: &str) -> Status {
        match self {
            Dialect::Jira => match value {
                "Closed" => Status::Closed,
                "Inaccurate" | "New" | "Open" => Status::Open,
                "In Progress" => Status::Assigned,
                "Resolved" => Status::Resolved,
                _ => Status::Unknown,
            },
            Dialect::Bugzilla => match value.to_ascii_uppercase().as_str() {
                "UNCONFIRMED" | "NEW" | "REOPENED" | "CONFIRMED" => Status::Open,
                "ASSIGNED" | "IN_PROGRESS" => Status::Assigned,
                "RESOLVED" => Status::Resolved,
                "VERIFIED" => Status::Verified,
                "CLOSED" => Status::Closed,
                "" => Status::None,
                _ => Status::Unknown,
            },
            Dialect::Github => match value.to_ascii_lowercase().as_str() {
                "open" => Status::Open,
                "closed" => Status::Closed,
                "" => Status::None,
                _ => Status::Unknown,
            },
        }
    }

    pub fn resolution(self, value: &str) -> Resolution {
        match self {
            Dialect::Jira => match value {
                "Fixed" | "Completed" | "Resolved Locally" => Resolution::Fixed,
                // "Won't Fix", however the apostrophe survived the miner
                v if v.ends_with("t Fix") => Resolution::Fixed,
                "Cannot Reproduce" | "Incomplete" => Resolution::Invalid,
                "Duplicate" => Resolution::Duplicated,
                "Unresolved" | "Time Out" => Resolution::WontFix,
                "" => Resolution::None,
                _ => Resolution::Unknown,
            },
            Dialect::Bugzilla => match value.to_ascii_uppercase().as_str() {
                "FIXED" => Resolution::Fixed,
                "INVALID" => Resolution::Invalid,
                "WONTFIX" => Resolution::WontFix,
                "DUPLICATE" => Resolution::Duplicated,
                "WORKSFORME" => Resolution::WorksForMe,
                "LATER" => Resolution::Later,
                "REMIND" => Resolution::Remind,
                "MOVED" | "UPSTREAM" => Resolution::ThirdParty,
                "" => Resolution::None,
                _ => Resolution::Unknown,
            },
            Dialect::Github => Resolution::None,
        }
    }

    pub fn severity(self, value: &str) -> Severity {
        match self {
            Dialect::Jira | Dialect::Bugzilla => match value.to_ascii_lowercase().as_str() {
                "trivial" => Severity::Trivial,
                "minor" => Severity::Minor,
                "normal" => Severity::Normal,
                "major" => Severity::Major,
                "critical" => Severity::Critical,
                "blocker" => Severity::Blocker,
                "enhancement" | "new feature" | "wishlist" => Severity::Feature,
                "" => Severity::None,
                _ => Severity::Unknown,
            },
            Dialect::Github => Severity::None,
        }
    }

    pub fn priority(self, value: &str) -> Priority {
        match self {
            Dialect::Jira => match value {
                "Trivial" | "" => Priority::Level(1),
                "Minor" => Priority::Level(2),
                "Major" => Priority::Level(3),
                "Critical" => Priority::Level(4),
                "Blocker" => Priority::Level(5),
                _ => Priority::Unknown,
            },
            // P1 is the most urgent in Bugzilla.
            Dialect::Bugzilla => match value.to_ascii_uppercase().as_str() {
                "P1" => Priority::Level(5),
                "P2" => Priority::Level(4),
                "P3" => Priority::Level(3),
                "P4" => Priority::Level(2),
                "P5" => Priority::Level(1),
                "" | "--" => Priority::None,
                _ => Priority::Unknown,
            },
            Dialect::Github => Priority::None,
        }
    }

    /// Public web address of an issue, for trackers where it can be derived
    /// from the tracker URL. Jira links come from the store instead.
    pub fn derived_issue_url(self, tracker_url: &str, public_id: &str) -> Option<String> {
        match self {
            Dialect::Bugzilla => {
                let base = tracker_url.split('?').next().unwrap_or(tracker_url);
                // only a path segment after the host is dropped
                let (scheme, path) = base.split_at(base.find("://").map_or(0, |i| i + 3));
                let path = path.rsplit_once('/').map_or(path, |(dir, _)| dir);
                Some(format!("{scheme}{path}/show_bug.cgi?id={public_id}"))
            }
            Dialect::Github => Some(format!("{}/{public_id}", tracker_url.trim_end_matches('/'))),
            Dialect::Jira => None,
        }
    }
}
