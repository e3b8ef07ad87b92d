//! Resource names for configuration variables.

use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a single variable: `projects/{project}/configs/{config}/variables/{variable}`.
///
/// # Examples
///
/// ```rust
/// use runtimevar_watch::core::ResourceName;
///
/// let name = ResourceName::new("my-project", "app", "feature-flags");
/// assert_eq!(
///     name.to_string(),
///     "projects/my-project/configs/app/variables/feature-flags"
/// );
/// assert_eq!(name.to_string().parse::<ResourceName>().unwrap(), name);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceName {
    /// Project that owns the configuration
    pub project_id: String,
    /// Configuration resource name
    pub config: String,
    /// Variable name; may itself contain `/`
    pub variable: String,
}

impl ResourceName {
    /// Create a resource name from its components.
    pub fn new(
        project_id: impl Into<String>,
        config: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            config: config.into(),
            variable: variable.into(),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/configs/{}/variables/{}",
            self.project_id, self.config, self.variable
        )
    }
}

impl FromStr for ResourceName {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            WatchError::InvalidOption(format!("invalid resource name {:?}: {}", s, reason))
        };

        let rest = s
            .trim_start_matches('/')
            .strip_prefix("projects/")
            .ok_or_else(|| invalid("expected projects/ prefix"))?;
        let (project_id, rest) = rest
            .split_once("/configs/")
            .ok_or_else(|| invalid("missing /configs/ segment"))?;
        let (config, variable) = rest
            .split_once("/variables/")
            .ok_or_else(|| invalid("missing /variables/ segment"))?;

        if project_id.is_empty() || project_id.contains('/') {
            return Err(invalid("empty or nested project"));
        }
        if config.is_empty() || config.contains('/') {
            return Err(invalid("empty or nested config"));
        }
        if variable.is_empty() {
            return Err(invalid("empty variable"));
        }

        Ok(Self::new(project_id, config, variable))
    }
}
