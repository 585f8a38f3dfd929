//! Topic constants for PUB/SUB routing.
//!
//! Topics follow the pattern `kesi.<entity>.<event>`. Subscribers can
//! filter on `kesi.issue.` to get both issue topics.

/// A commit was recorded in a source-control repository.
pub const COMMIT_NEW: &str = "kesi.commit.new";

/// An issue was opened on a tracker.
pub const ISSUE_NEW: &str = "kesi.issue.new";

/// An existing issue received a comment or a field change.
pub const ISSUE_UPDATE: &str = "kesi.issue.update";

/// Every topic the pipeline publishes on.
pub const ALL: [&str; 3] = [COMMIT_NEW, ISSUE_NEW, ISSUE_UPDATE];
