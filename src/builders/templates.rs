use serde::Serialize;
use std::fmt;

/// The closed set of virtual host templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VhostKind {
    /// Serves the document root as-is.
    Standard,
    /// The document root is an application root; its `public/` subdirectory
    /// is served and logs go to its `log/` subdirectory (Passenger style).
    FrameworkServed,
}

impl fmt::Display for VhostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VhostKind::Standard => write!(f, "VirtualHost"),
            VhostKind::FrameworkServed => write!(f, "Rails VirtualHost"),
        }
    }
}

/// Parameters for rendering one virtual host stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentParams {
    pub domain: String,
    pub doc_root: String,
    pub kind: VhostKind,
}

impl FragmentParams {
    pub fn new(domain: impl Into<String>, doc_root: impl Into<String>, kind: VhostKind) -> Self {
        Self {
            domain: domain.into(),
            doc_root: doc_root.into(),
            kind,
        }
    }

    /// The document root after normalization, see [`normalize_root`].
    pub fn root(&self) -> String {
        normalize_root(self.kind, &self.doc_root)
    }

    pub fn render(&self) -> String {
        render(self.kind, &self.domain, &self.doc_root)
    }
}

/// Strips trailing separators. For framework-served hosts a trailing
/// `/public` is stripped too, since the template appends it itself.
pub fn normalize_root(kind: VhostKind, doc_root: &str) -> String {
    let mut root = trim_separators(doc_root);
    if kind == VhostKind::FrameworkServed
        && let Some(project) = root.strip_suffix("/public")
    {
        root = trim_separators(project);
    }
    root.to_string()
}

fn trim_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Renders a self-contained stanza that starts and ends with a blank line, so
/// it can be appended to any file as-is.
pub fn render(kind: VhostKind, domain: &str, doc_root: &str) -> String {
    let root = normalize_root(kind, doc_root);
    match kind {
        VhostKind::Standard => format!(
            r#"
<VirtualHost *:80>
	DocumentRoot "{root}"
	ServerName {domain}
	ErrorLog "/var/log/apache2/{domain}.error_log"
	CustomLog "/var/log/apache2/{domain}.access_log" common

	<Directory "{root}">
		Options MultiViews Indexes SymLinksIfOwnerMatch
		AllowOverride all
	</Directory>
</VirtualHost>

"#
        ),
        VhostKind::FrameworkServed => {
            let base = if root == "/" { "" } else { root.as_str() };
            format!(
                r#"
<VirtualHost *:80>
	ServerName {domain}
	DocumentRoot "{base}/public"
	ErrorLog "{base}/log/error_log"
	CustomLog "{base}/log/access_log" common
	RailsEnv development

	<Directory "{base}/public">
		AllowOverride all
		Options -MultiViews
	</Directory>
</VirtualHost>

"#
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::patterns::{DomainPattern, PatternMatcher};

    #[test]
    fn test_standard_stanza() {
        let text = render(VhostKind::Standard, "example.local", "/srv/www/");
        assert!(text.starts_with("\n<VirtualHost *:80>\n"));
        assert!(text.ends_with("</VirtualHost>\n\n"));
        assert!(text.contains("\tDocumentRoot \"/srv/www\"\n"));
        assert!(text.contains("\tServerName example.local\n"));
        assert!(text.contains("ErrorLog \"/var/log/apache2/example.local.error_log\""));
        assert!(text.contains("<Directory \"/srv/www\">"));
        assert!(text.contains("Indexes"));
        assert!(text.contains("AllowOverride all"));
    }

    #[test]
    fn test_rendered_stanza_is_detected() {
        let text = render(VhostKind::Standard, "example.local", "/srv/www");
        let pattern = DomainPattern::server_name("example.local").unwrap();
        assert!(pattern.classify(&text).is_present());

        let text = render(VhostKind::FrameworkServed, "rails.local", "/srv/app");
        let pattern = DomainPattern::server_name("rails.local").unwrap();
        assert!(pattern.classify(&text).is_present());
    }

    #[test]
    fn test_framework_stanza() {
        let text = render(VhostKind::FrameworkServed, "d", "/a/b");
        assert!(text.contains("DocumentRoot \"/a/b/public\""));
        assert!(text.contains("ErrorLog \"/a/b/log/error_log\""));
        assert!(text.contains("CustomLog \"/a/b/log/access_log\" common"));
        assert!(text.contains("<Directory \"/a/b/public\">"));
        assert!(text.contains("RailsEnv development"));
        assert!(text.contains("Options -MultiViews"));
    }

    #[test]
    fn test_framework_public_suffix_is_normalized() {
        let expected = render(VhostKind::FrameworkServed, "d", "/a/b");
        assert_eq!(render(VhostKind::FrameworkServed, "d", "/a/b/public"), expected);
        assert_eq!(render(VhostKind::FrameworkServed, "d", "/a/b/public/"), expected);
        assert_eq!(render(VhostKind::FrameworkServed, "d", "/a/b/"), expected);
    }

    #[test]
    fn test_standard_keeps_public_suffix() {
        assert_eq!(
            normalize_root(VhostKind::Standard, "/a/b/public/"),
            "/a/b/public"
        );
    }

    #[test]
    fn test_root_directory_survives_normalization() {
        assert_eq!(normalize_root(VhostKind::Standard, "/"), "/");
        let params = FragmentParams::new("d", "//", VhostKind::Standard);
        assert_eq!(params.root(), "/");
        assert!(params.render().contains("DocumentRoot \"/\""));
    }
}
