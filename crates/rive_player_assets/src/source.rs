//! Source URI classification

use rive_player_core::FetchError;
use std::path::PathBuf;

/// Where the bytes of a source URI come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Filesystem path (bare path or `file://` URI)
    File(PathBuf),
    /// `http://` or `https://` URL
    Url(String),
    /// `ms-appx:///` path relative to the application's asset root
    AppPackage(String),
    /// Base64 payload of a `data:` URI
    Base64(String),
}

impl AssetSource {
    /// Classify `uri` by its scheme
    pub fn parse(uri: &str) -> Result<Self, FetchError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(FetchError::InvalidUri("empty source".to_string()));
        }

        let Some(scheme) = scheme_of(uri).filter(|scheme| scheme.len() > 1) else {
            return Ok(AssetSource::File(PathBuf::from(uri)));
        };
        let rest = &uri[scheme.len() + 1..];

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(AssetSource::Url(uri.to_string())),
            "ms-appx" => {
                // ms-appx:///Assets/a.riv, or ms-appx://package/Assets/a.riv
                let path = match rest.strip_prefix("//") {
                    Some(authority_and_path) => authority_and_path
                        .find('/')
                        .map(|pos| &authority_and_path[pos..])
                        .unwrap_or(""),
                    None => rest,
                };
                let path = path.trim_start_matches('/');
                if path.is_empty() {
                    return Err(FetchError::InvalidUri(format!("{} has no path", uri)));
                }
                if escapes_root(path) {
                    return Err(FetchError::InvalidUri(format!(
                        "{} points outside the application package",
                        uri
                    )));
                }
                Ok(AssetSource::AppPackage(path.to_string()))
            }
            "file" => {
                let path = rest.strip_prefix("//").unwrap_or(rest);
                // file:///C:/dir/a.riv
                let path = match path.strip_prefix('/') {
                    Some(windows) if scheme_of(windows).is_some_and(|s| s.len() == 1) => windows,
                    _ => path,
                };
                Ok(AssetSource::File(PathBuf::from(path)))
            }
            "data" => {
                let payload = rest
                    .find(";base64,")
                    .map(|pos| &rest[pos + 8..])
                    .ok_or_else(|| {
                        FetchError::Decode("data URI is not base64 encoded".to_string())
                    })?;
                Ok(AssetSource::Base64(payload.to_string()))
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Whether a package-relative path climbs above the package root
fn escapes_root(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let segment = segment.replace("%2e", ".").replace("%2E", ".");
        segment == ".." || segment.contains(':')
    })
}

/// The URI scheme, if `uri` has one
///
/// A single-letter scheme is a Windows drive (`C:\...`) and is returned as
/// is; callers treat it as a path.
fn scheme_of(uri: &str) -> Option<&str> {
    let colon = uri.find(':')?;
    let scheme = &uri[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(
            AssetSource::parse("https://cdn.example.com/a.riv").unwrap(),
            AssetSource::Url("https://cdn.example.com/a.riv".into())
        );
        assert_eq!(
            AssetSource::parse("HTTP://host/a.riv").unwrap(),
            AssetSource::Url("HTTP://host/a.riv".into())
        );
    }

    #[test]
    fn test_app_package() {
        assert_eq!(
            AssetSource::parse("ms-appx:///Assets/button.riv").unwrap(),
            AssetSource::AppPackage("Assets/button.riv".into())
        );
        assert_eq!(
            AssetSource::parse("ms-appx://my.package/Assets/button.riv").unwrap(),
            AssetSource::AppPackage("Assets/button.riv".into())
        );
        assert!(matches!(
            AssetSource::parse("ms-appx:///"),
            Err(FetchError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_app_package_stays_inside_root() {
        for uri in [
            "ms-appx:///../secret.riv",
            "ms-appx:///Assets/../../secret.riv",
            "ms-appx:///Assets\\..\\..\\secret.riv",
            "ms-appx:///%2e%2e/secret.riv",
            "ms-appx://pkg/Assets/C:/secret.riv",
        ] {
            assert!(
                matches!(AssetSource::parse(uri), Err(FetchError::InvalidUri(_))),
                "{} was accepted",
                uri
            );
        }
        assert_eq!(
            AssetSource::parse("ms-appx:///Assets/..hidden/a.riv").unwrap(),
            AssetSource::AppPackage("Assets/..hidden/a.riv".into())
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            AssetSource::parse("assets/a.riv").unwrap(),
            AssetSource::File("assets/a.riv".into())
        );
        assert_eq!(
            AssetSource::parse("file:///tmp/a.riv").unwrap(),
            AssetSource::File("/tmp/a.riv".into())
        );
        assert_eq!(
            AssetSource::parse("C:\\anims\\a.riv").unwrap(),
            AssetSource::File("C:\\anims\\a.riv".into())
        );
        assert_eq!(
            AssetSource::parse("file:///C:/anims/a.riv").unwrap(),
            AssetSource::File("C:/anims/a.riv".into())
        );
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(
            AssetSource::parse("data:application/octet-stream;base64,UklWRQ==").unwrap(),
            AssetSource::Base64("UklWRQ==".into())
        );
        assert!(matches!(
            AssetSource::parse("data:text/plain,hello"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert_eq!(
            AssetSource::parse("ftp://host/a.riv"),
            Err(FetchError::UnsupportedScheme("ftp".into()))
        );
        assert!(matches!(
            AssetSource::parse("  "),
            Err(FetchError::InvalidUri(_))
        ));
    }
}
