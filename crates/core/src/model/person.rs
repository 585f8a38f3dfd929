use serde::{Deserialize, Serialize};

/// A participant: reporter, assignee, commenter, author or committer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Account name on the tracker, when known.
    pub user_id: Option<String>,
}

impl Person {
    /// Best available identifier: e-mail, then account, then display name.
    pub fn id(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.user_id.as_deref())
            .or(self.name.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}
