//! Git repositories, fetched at a branch, tag or commit named by the URL fragment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Error;
use crate::archive::{TEMP_PREFIX, ZipArtefact};
use crate::handler::{Handler, LocalHandler};
use crate::source::Source;

/// How a [`Revision`] was named by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionKind {
    /// No reference given: the remote's default branch.
    Head,
    Branch(String),
    Tag(String),
    Commit,
}

/// A reference resolved against a remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Full hex id of the commit.
    pub commit: String,
    pub kind: RevisionKind,
}

/// The version-control operations the [`GitHandler`] needs.
pub trait Vcs: Send + Sync {
    /// Resolve `reference` (or the default branch when `None`) without cloning.
    fn resolve(&self, url: &str, reference: Option<&str>) -> Result<Revision, Error>;

    /// Check out the working tree of `revision` into the empty directory `into`.
    fn materialize(&self, url: &str, revision: &Revision, into: &Path) -> Result<(), Error>;
}

/// [`Vcs`] implemented with libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2;

impl Vcs for Git2 {
    fn resolve(&self, url: &str, reference: Option<&str>) -> Result<Revision, Error> {
        let mut remote = git2::Remote::create_detached(url)?;
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(credentials_callback());
        let connection = remote.connect_auth(git2::Direction::Fetch, Some(callbacks), None)?;
        let heads: HashMap<String, String> = connection
            .list()?
            .iter()
            .map(|head| (head.name().to_string(), head.oid().to_string()))
            .collect();
        tracing::debug!(url, refs = heads.len(), "listed remote references");
        resolve_in(&heads, url, reference)
    }

    fn materialize(&self, url: &str, revision: &Revision, into: &Path) -> Result<(), Error> {
        let repo = match &revision.kind {
            RevisionKind::Branch(branch) => {
                git2::Repository::clone_into(url, Some(branch.as_str()), into)?
            }
            _ => git2::Repository::clone_into(url, None, into)?,
        };
        if !matches!(revision.kind, RevisionKind::Head | RevisionKind::Branch(_)) {
            repo.checkout_commit(&revision.commit)?;
        }
        repo.update_submodules_recursive()?;
        Ok(())
    }
}

/// Branch first, then tag (peeled to its commit), then a full commit id taken verbatim.
fn resolve_in(
    heads: &HashMap<String, String>,
    url: &str,
    reference: Option<&str>,
) -> Result<Revision, Error> {
    let unresolved = || Error::UnresolvedReference {
        url: url.to_string(),
        reference: reference.unwrap_or("HEAD").to_string(),
    };
    let Some(reference) = reference else {
        let commit = heads.get("HEAD").ok_or_else(unresolved)?;
        return Ok(Revision {
            commit: commit.clone(),
            kind: RevisionKind::Head,
        });
    };
    if let Some(commit) = heads.get(&format!("refs/heads/{reference}")) {
        return Ok(Revision {
            commit: commit.clone(),
            kind: RevisionKind::Branch(reference.to_string()),
        });
    }
    let tag = format!("refs/tags/{reference}");
    if let Some(commit) = heads
        .get(&format!("{tag}^{{}}"))
        .or_else(|| heads.get(&tag))
    {
        return Ok(Revision {
            commit: commit.clone(),
            kind: RevisionKind::Tag(reference.to_string()),
        });
    }
    if is_commit_id(reference) {
        return Ok(Revision {
            commit: reference.to_lowercase(),
            kind: RevisionKind::Commit,
        });
    }
    Err(unresolved())
}

fn is_commit_id(reference: &str) -> bool {
    reference.len() == 40 && reference.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Fetches git repositories over HTTP(S) or SSH.
///
/// The fingerprint is the commit id the reference resolves to, so no content is downloaded to
/// compute it. The working tree is checked out into a temporary directory and archived like a
/// local directory, which leaves out `.git`.
#[derive(Clone)]
pub struct GitHandler {
    vcs: Arc<dyn Vcs>,
    local: LocalHandler,
}

impl Default for GitHandler {
    fn default() -> Self {
        Self::new(LocalHandler::default())
    }
}

impl GitHandler {
    pub const NAME: &'static str = "git";

    /// A handler backed by libgit2 which archives checkouts with `local`.
    pub fn new(local: LocalHandler) -> Self {
        Self::with_vcs(Arc::new(Git2), local)
    }

    pub fn with_vcs(vcs: Arc<dyn Vcs>, local: LocalHandler) -> Self {
        Self { vcs, local }
    }

    /// Whether `location` is an HTTP(S), `ssh://` or scp-like (`user@host:path`) URL.
    fn is_remote_url(location: &str) -> bool {
        if ["http://", "https://", "ssh://"]
            .iter()
            .any(|scheme| location.starts_with(scheme))
        {
            return true;
        }
        !location.contains("://")
            && location
                .split_once(':')
                .is_some_and(|(host, _)| host.contains('@') && !host.contains('/'))
    }
}

impl std::fmt::Debug for GitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHandler")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

impl Handler for GitHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn detect(&self, source: &Source) -> bool {
        let location = source.location();
        Self::is_remote_url(location) && location.ends_with(".git")
    }

    fn zip(&self, source: &Source) -> Result<ZipArtefact, Error> {
        let url = source.location();
        let revision = self.vcs.resolve(url, source.reference())?;
        tracing::info!(url, commit = %revision.commit, "checking out repository");
        let checkout = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
        self.vcs.materialize(url, &revision, checkout.path())?;
        let artefact = self.local.archive_dir(checkout.path())?;
        if let Err(err) = checkout.close() {
            tracing::warn!("failed to remove checkout: {err}");
        }
        Ok(artefact)
    }

    fn fingerprint(&self, source: &Source) -> Result<String, Error> {
        Ok(self
            .vcs
            .resolve(source.location(), source.reference())?
            .commit)
    }
}

trait RepositoryExt {
    fn clone_into(
        url: &str,
        branch: Option<&str>,
        into: &Path,
    ) -> Result<git2::Repository, git2::Error>;
    fn checkout_commit(&self, sha: &str) -> Result<(), git2::Error>;
    fn update_submodules_recursive(&self) -> Result<(), git2::Error>;
}

trait SubmoduleExt {
    fn update_with_credentials(&mut self) -> Result<(), git2::Error>;
    fn open_in(&self, top_level: &Path) -> Result<git2::Repository, git2::Error>;
}

fn fetch_options<'cb>() -> git2::FetchOptions<'cb> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(credentials_callback());
    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options
}

impl RepositoryExt for git2::Repository {
    fn clone_into(
        url: &str,
        branch: Option<&str>,
        into: &Path,
    ) -> Result<git2::Repository, git2::Error> {
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_options());
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        builder.clone(url, into)
    }

    fn checkout_commit(&self, sha: &str) -> Result<(), git2::Error> {
        let commit = self.find_commit(git2::Oid::from_str(sha)?)?;
        self.set_head_detached(commit.id())?;
        let mut checkout_builder = git2::build::CheckoutBuilder::new();
        checkout_builder.force();
        self.checkout_tree(commit.as_object(), Some(&mut checkout_builder))
    }

    fn update_submodules_recursive(&self) -> Result<(), git2::Error> {
        for mut submodule in self.submodules()? {
            submodule.update_with_credentials()?;
            if let Some(workdir) = self.workdir() {
                submodule.open_in(workdir)?.update_submodules_recursive()?;
            }
        }
        Ok(())
    }
}

impl SubmoduleExt for git2::Submodule<'_> {
    fn update_with_credentials(&mut self) -> Result<(), git2::Error> {
        let mut update_options = git2::SubmoduleUpdateOptions::new();
        update_options.fetch(fetch_options());
        self.update(true, Some(&mut update_options))
    }

    fn open_in(&self, top_level: &Path) -> Result<git2::Repository, git2::Error> {
        git2::Repository::open(top_level.join(self.path()))
    }
}

/// libgit2 asks again after rejected credentials, so stop after a few attempts.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// SSH uses the key in `GIT_IDENTITY_FILE` if set, otherwise the SSH agent. Plaintext auth uses
/// the user and password embedded in the URL. Nothing is prompted for.
fn credentials_callback()
-> impl FnMut(&str, Option<&str>, git2::CredentialType) -> Result<git2::Cred, git2::Error> {
    let mut attempts = 0;
    move |url, username_from_url, credential_type| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(&format!(
                "authentication failed for {url}"
            )));
        }
        if credential_type.contains(git2::CredentialType::SSH_KEY) {
            let user = username_from_url.unwrap_or("git");
            match std::env::var_os("GIT_IDENTITY_FILE").map(PathBuf::from) {
                Some(identity_file) => git2::Cred::ssh_key(user, None, &identity_file, None),
                None => git2::Cred::ssh_key_from_agent(user),
            }
        } else if credential_type.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            let parsed = url::Url::parse(url)
                .map_err(|err| git2::Error::from_str(&format!("invalid url {url}: {err}")))?;
            let username = username_from_url.unwrap_or(parsed.username());
            match parsed.password() {
                Some(password) if !username.is_empty() => {
                    git2::Cred::userpass_plaintext(username, password)
                }
                _ => Err(git2::Error::from_str(&format!(
                    "{url} requires a username and password in the URL"
                ))),
            }
        } else if credential_type.contains(git2::CredentialType::DEFAULT) {
            git2::Cred::default()
        } else {
            Err(git2::Error::from_str(
                "Unsupported credential type, expected ssh or plaintext",
            ))
        }
    }
}
