use crate::config::AppConfig;
use crate::model::{PathPair, PathSet, RepositoryRecord};
use deunicode::deunicode;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};

/// Live data root on the platform host; shard paths look like
/// `/data/repositories/1/nw/13/85/97/140/177.git`.
pub const DEFAULT_DATA_PREFIX: &str = "/data/";

const REPO_SUFFIX: &str = ".git";
const WIKI_SUFFIX: &str = ".wiki.git";
const FANOUT_CHARS: usize = 4;

#[derive(Clone, Debug)]
pub struct ArchiveLayout {
    pub archive_root: PathBuf,
    pub snapshot_root: PathBuf,
    pub data_prefix: String,
}

impl ArchiveLayout {
    pub fn new(archive_root: PathBuf, snapshot_root: PathBuf) -> Self {
        Self {
            archive_root,
            snapshot_root,
            data_prefix: DEFAULT_DATA_PREFIX.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            archive_root: config.dir.archive.clone(),
            snapshot_root: config.dir.snapshots.clone(),
            data_prefix: config.dir.data_prefix.clone(),
        }
    }

    pub fn resolve(&self, repo: &RepositoryRecord) -> PathSet {
        resolve_paths_under(
            &repo.id,
            &repo.owner,
            &repo.name,
            &repo.shard_path,
            &self.archive_root,
            &self.snapshot_root,
            &self.data_prefix,
        )
    }
}

pub fn resolve_paths(
    id: &str,
    owner: &str,
    name: &str,
    shard_path: &str,
    archive_root: &Path,
    snapshot_root: &Path,
) -> PathSet {
    resolve_paths_under(
        id,
        owner,
        name,
        shard_path,
        archive_root,
        snapshot_root,
        DEFAULT_DATA_PREFIX,
    )
}

fn resolve_paths_under(
    id: &str,
    owner: &str,
    name: &str,
    shard_path: &str,
    archive_root: &Path,
    snapshot_root: &Path,
    data_prefix: &str,
) -> PathSet {
    let stem = archive_stem(id, owner, name);
    let archive_dir = archive_root.join(fanout_dir(&stem));

    let relative = shard_path
        .strip_prefix(data_prefix)
        .unwrap_or(shard_path)
        .trim_start_matches('/');
    let snapshot_code = snapshot_root.join(relative);
    let snapshot_wiki = wiki_snapshot_path(&snapshot_code);

    PathSet {
        id: id.to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        dir: shard_path.to_string(),
        snapshot: PathPair {
            code: snapshot_code,
            wiki: snapshot_wiki,
        },
        archive: PathPair {
            code: archive_dir.join(format!("{stem}.tar")),
            wiki: archive_dir.join(format!("{stem}.wiki.tar")),
        },
    }
}

fn archive_stem(id: &str, owner: &str, name: &str) -> String {
    deunicode(&format!("{id}_{owner}_{name}"))
}

fn fanout_dir(stem: &str) -> String {
    let digest = hex::encode(Md5::digest(stem.as_bytes()));
    digest[..FANOUT_CHARS].to_string()
}

fn wiki_snapshot_path(code: &Path) -> PathBuf {
    let code = code.to_string_lossy();
    let base = code.strip_suffix(REPO_SUFFIX).unwrap_or(&code);
    PathBuf::from(format!("{base}{WIKI_SUFFIX}"))
}
