use crate::error::{CodequityError, Result};
use crate::git::GitRepo;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Where the history comes from: an existing local checkout, or a remote
/// that must be cloned into a transient directory first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Resolve a location descriptor.
///
/// Empty means the current working directory, an existing path is opened in
/// place, `owner/repo` expands to its GitHub URL, and anything carrying a
/// scheme or an scp-style remote is passed to the clone verbatim.
pub fn parse_location(arg: Option<&str>) -> Result<Location> {
    let arg = arg.unwrap_or("").trim();
    if arg.is_empty() {
        return Ok(Location::Local(
            std::env::current_dir().map_err(|e| CodequityError::Acquisition(e.to_string()))?,
        ));
    }

    if Path::new(arg).is_dir() {
        return Ok(Location::Local(PathBuf::from(arg)));
    }

    if arg.contains("://") || arg.starts_with("git@") {
        return Ok(Location::Remote(arg.to_string()));
    }

    let parts: Vec<&str> = arg.split('/').collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        return Ok(Location::Remote(format!(
            "https://github.com/{}/{}",
            parts[0], parts[1]
        )));
    }

    Err(CodequityError::LocationInvalid(arg.to_string()))
}

/// A readable repository plus whatever transient state backs it.
///
/// When the location was remote, the clone lives in a `TempDir` owned here,
/// so the checkout is removed on drop on every exit path.
pub struct AcquiredRepo {
    repo: GitRepo,
    _workdir: Option<TempDir>,
}

impl AcquiredRepo {
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }
}

pub fn acquire(location: &Location, credentials: Option<&Credentials>) -> Result<AcquiredRepo> {
    match location {
        Location::Local(path) => Ok(AcquiredRepo {
            repo: GitRepo::open(path)?,
            _workdir: None,
        }),
        Location::Remote(url) => {
            let workdir = tempfile::Builder::new()
                .prefix("codequity-")
                .tempdir()
                .map_err(|e| {
                    CodequityError::Acquisition(format!("failed to create temp directory: {e}"))
                })?;

            eprintln!("Cloning repository {url}...");
            clone_into(url, workdir.path(), credentials)?;

            Ok(AcquiredRepo {
                repo: GitRepo::open(workdir.path())?,
                _workdir: Some(workdir),
            })
        }
    }
}

// Clone via the git binary. Credentials travel through the child's
// environment and a one-shot credential helper, never through argv or the
// URL. Ambient git config is masked so the clone behaves the same on every
// machine.
fn clone_into(url: &str, dir: &Path, credentials: Option<&Credentials>) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.stdin(Stdio::null());

    if let Some(creds) = credentials {
        cmd.env("CODEQUITY_GIT_USERNAME", &creds.username);
        cmd.env("CODEQUITY_GIT_PASSWORD", &creds.password);
        cmd.arg("-c").arg("credential.helper=");
        cmd.arg("-c").arg(
            r#"credential.helper=!f() { echo "username=$CODEQUITY_GIT_USERNAME"; echo "password=$CODEQUITY_GIT_PASSWORD"; }; f"#,
        );
    }

    cmd.arg("clone").arg("--quiet").arg(url).arg(dir);

    let output = cmd
        .output()
        .map_err(|e| CodequityError::Acquisition(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CodequityError::Acquisition(format!(
            "failed to clone {url}: {}",
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_location_is_current_dir() {
        let loc = parse_location(None).unwrap();
        assert!(matches!(loc, Location::Local(_)));
    }

    #[test]
    fn existing_path_is_local() {
        let dir = tempfile::tempdir().unwrap();
        let loc = parse_location(Some(dir.path().to_str().unwrap())).unwrap();
        assert_eq!(loc, Location::Local(dir.path().to_path_buf()));
    }

    #[test]
    fn shorthand_expands_to_github() {
        let loc = parse_location(Some("octo/spoon")).unwrap();
        assert_eq!(
            loc,
            Location::Remote("https://github.com/octo/spoon".to_string())
        );
    }

    #[test]
    fn full_urls_pass_through() {
        for url in [
            "https://gitlab.com/group/repo",
            "https://bitbucket.org/workspace/repo",
            "git@github.com:owner/repo.git",
        ] {
            let loc = parse_location(Some(url)).unwrap();
            assert_eq!(loc, Location::Remote(url.to_string()));
        }
    }

    #[test]
    fn malformed_shorthand_is_rejected() {
        for bad in ["a/b/c", "/leading", "trailing/", "noslash"] {
            assert!(matches!(
                parse_location(Some(bad)),
                Err(CodequityError::LocationInvalid(_))
            ));
        }
    }
}
