use std::fmt;

/// A catalog app reference as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentifier {
    pub author: String,
    pub repo: String,
    pub tag: Option<String>,
}

impl AppIdentifier {
    /// Parse an app identifier:
    /// - "owner/repo" (latest release)
    /// - "owner/repo@v1.2.3" (specific release tag)
    pub fn parse(app_id: &str) -> Result<Self, String> {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err("App identifier cannot be empty".to_string());
        }

        if app_id.starts_with('-') {
            return Err(format!(
                "Invalid app identifier '{}'. It looks like a CLI flag.",
                app_id
            ));
        }

        // Tags may themselves contain '/', so split on the first '@' only
        let (repo_part, tag) = match app_id.split_once('@') {
            Some((repo, tag)) if !tag.is_empty() => (repo, Some(tag.to_string())),
            Some((repo, _)) => (repo, None),
            None => (app_id, None),
        };

        match repo_part.split('/').collect::<Vec<_>>().as_slice() {
            [author, repo] if !author.is_empty() && !repo.is_empty() => Ok(AppIdentifier {
                author: author.to_string(),
                repo: repo.to_string(),
                tag,
            }),
            _ => Err(format!(
                "Invalid repository format '{}', expected 'owner/repo'",
                repo_part
            )),
        }
    }

    /// Catalog id (`owner/repo`)
    pub fn id(&self) -> String {
        format!("{}/{}", self.author, self.repo)
    }
}

impl fmt::Display for AppIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}@{}", self.id(), tag),
            None => write!(f, "{}", self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let id = AppIdentifier::parse("owner/repo").unwrap();
        assert_eq!(id.id(), "owner/repo");
        assert_eq!(id.tag, None);

        let id = AppIdentifier::parse("owner/repo@infisical-cli/v0.41.90").unwrap();
        assert_eq!(id.tag.as_deref(), Some("infisical-cli/v0.41.90"));
        assert_eq!(id.to_string(), "owner/repo@infisical-cli/v0.41.90");

        assert_eq!(AppIdentifier::parse("owner/repo@").unwrap().tag, None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(AppIdentifier::parse("").is_err());
        assert!(AppIdentifier::parse("--help").is_err());
        assert!(AppIdentifier::parse("justrepo").is_err());
        assert!(AppIdentifier::parse("a/b/c").is_err());
        assert!(AppIdentifier::parse("/b").is_err());
    }
}
