//! Model download from the HuggingFace Hub.
//!
//! A repo id has the form `owner/repo` with an optional `@revision`. The
//! repo must carry the same files as a local model directory; they land in
//! the hf-hub cache and the snapshot directory is loaded like any other.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};

use super::model::KokoroError;

/// ONNX graph fetched from the repo.
pub const HUB_ONNX_FILE: &str = "kokoro-v1.0.onnx";
/// Voice archive fetched from the repo.
pub const HUB_VOICES_FILE: &str = "voices-v1.0.bin";

/// Pick the directory to load the model from.
///
/// Without a repo id this is `model_dir` untouched. With one, the model
/// files are downloaded (or taken from the cache) and their snapshot
/// directory is returned. `HF_TOKEN` is used for gated repos.
pub fn resolve_model_dir(model_dir: &Path, repo_id: Option<&str>) -> Result<PathBuf, KokoroError> {
    let Some(repo_id) = repo_id else {
        return Ok(model_dir.to_path_buf());
    };
    let (repo_name, revision) = parse_repo_id(repo_id)?;

    let token = std::env::var("HF_TOKEN").ok();
    let api = ApiBuilder::new()
        .with_token(token)
        .build()
        .map_err(|e| KokoroError::Hub(e.to_string()))?;
    let repo = match revision {
        Some(rev) => Repo::with_revision(repo_name.to_string(), RepoType::Model, rev.to_string()),
        None => Repo::model(repo_name.to_string()),
    };
    let api_repo = api.repo(repo);

    log::info!("Fetching Kokoro model from hf://{repo_id}");
    let onnx = api_repo
        .get(HUB_ONNX_FILE)
        .map_err(|e| KokoroError::Hub(format!("{repo_id}/{HUB_ONNX_FILE}: {e}")))?;
    api_repo
        .get(HUB_VOICES_FILE)
        .map_err(|e| KokoroError::Hub(format!("{repo_id}/{HUB_VOICES_FILE}: {e}")))?;
    if let Err(e) = api_repo.get("config.json") {
        log::debug!("No config.json in {repo_id}, using the built-in vocab: {e}");
    }

    onnx.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| KokoroError::Hub(format!("unexpected cache path {}", onnx.display())))
}

/// Split `owner/repo[@revision]`.
fn parse_repo_id(repo_id: &str) -> Result<(&str, Option<&str>), KokoroError> {
    let (name, revision) = match repo_id.rsplit_once('@') {
        Some((name, rev)) => (name, Some(rev)),
        None => (repo_id, None),
    };

    let valid_name = matches!(
        name.split('/').collect::<Vec<_>>().as_slice(),
        [owner, repo] if !owner.is_empty() && !repo.is_empty()
    );
    if !valid_name || revision.is_some_and(str::is_empty) {
        return Err(KokoroError::Hub(format!(
            "invalid repo id {repo_id:?}, expected owner/repo[@revision]"
        )));
    }
    Ok((name, revision))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_directory_is_used_without_repo_id() {
        let dir = Path::new("models/kokoro");
        assert_eq!(resolve_model_dir(dir, None).unwrap(), dir);
    }

    #[test]
    fn repo_id_with_and_without_revision() {
        assert_eq!(
            parse_repo_id("fastrtc/kokoro-onnx").unwrap(),
            ("fastrtc/kokoro-onnx", None)
        );
        assert_eq!(
            parse_repo_id("fastrtc/kokoro-onnx@main").unwrap(),
            ("fastrtc/kokoro-onnx", Some("main"))
        );
    }

    #[test]
    fn malformed_repo_ids_fail_before_any_download() {
        for bad in ["kokoro", "a/b/c", "/repo", "owner/", "owner/repo@", ""] {
            let err = resolve_model_dir(Path::new("unused"), Some(bad)).unwrap_err();
            assert!(matches!(err, KokoroError::Hub(_)), "{bad}: {err}");
        }
    }
}
