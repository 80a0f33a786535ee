use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// A full commit identifier, as git writes it into its control files.
static COMMIT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{40}$").expect("commit id pattern is valid"));

/// A symbolic head: `ref: refs/heads/main`.
static SYMBOLIC_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ref: (.*)$").expect("symbolic ref pattern is valid"));

/// One packed-refs entry: `<40-hex-id> <ref name>`. Annotation lines
/// (`^{}` peel lines, `#` headers) do not match and are skipped.
static PACKED_REF_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([0-9a-f]{40})\s+(.+)$").expect("packed ref pattern is valid"));

/// Resolve the commit identifier currently checked out in `repo_root`,
/// without invoking the git binary.
///
/// The head file either contains the identifier directly (detached head) or
/// a symbolic ref, which is followed through the loose ref file and then the
/// packed-refs table. `None` means "version unknown" and is never an error:
/// a missing repository, an unrecognized head format, or a ref with no
/// loose or packed entry (e.g. a repository with no commits yet) all land
/// here.
pub fn resolve_head(repo_root: &Path) -> Option<String> {
    let git_dir = repo_root.join(".git");

    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    if COMMIT_ID.is_match(head) {
        return Some(head.to_owned());
    }

    let ref_name = SYMBOLIC_REF.captures(head)?.get(1)?.as_str().to_owned();
    debug!("Head is symbolic, following ref: {}", ref_name);

    if let Ok(loose) = fs::read_to_string(git_dir.join(&ref_name)) {
        return Some(loose.trim().to_owned());
    }

    let packed = fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed_refs_table(&packed).remove(ref_name.as_str())
}

/// Parse a packed-refs blob into a ref-name -> identifier table.
/// Each line independently contributes one entry; malformed lines are
/// skipped, not fatal.
fn packed_refs_table(packed: &str) -> FxHashMap<String, String> {
    let mut refs = FxHashMap::default();
    for captures in PACKED_REF_LINE.captures_iter(packed.trim()) {
        let (Some(id), Some(name)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        refs.insert(name.as_str().to_owned(), id.as_str().to_owned());
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SHA_A: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0";
    const SHA_B: &str = "c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2";

    fn git_dir(root: &Path) -> std::path::PathBuf {
        let dir = root.join(".git");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_detached_head_returns_identifier_directly() {
        let temp = TempDir::new().unwrap();
        fs::write(git_dir(temp.path()).join("HEAD"), format!("{SHA_A}\n")).unwrap();

        assert_eq!(resolve_head(temp.path()), Some(SHA_A.to_owned()));
    }

    #[test]
    fn test_uppercase_identifier_is_accepted_verbatim() {
        let temp = TempDir::new().unwrap();
        let upper = SHA_A.to_uppercase();
        fs::write(git_dir(temp.path()).join("HEAD"), format!("{upper}\n")).unwrap();

        assert_eq!(resolve_head(temp.path()), Some(upper));
    }

    #[test]
    fn test_symbolic_head_with_loose_ref() {
        let temp = TempDir::new().unwrap();
        let git = git_dir(temp.path());
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("refs/heads/main"), format!("{SHA_A}\n")).unwrap();

        assert_eq!(resolve_head(temp.path()), Some(SHA_A.to_owned()));
    }

    #[test]
    fn test_symbolic_head_falls_back_to_packed_refs() {
        let temp = TempDir::new().unwrap();
        let git = git_dir(temp.path());
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(
            git.join("packed-refs"),
            format!(
                "# pack-refs with: peeled fully-peeled sorted \n\
                 {SHA_B} refs/heads/main\n\
                 {SHA_A} refs/tags/v1.0.0\n\
                 ^{SHA_A}\n"
            ),
        )
        .unwrap();

        assert_eq!(resolve_head(temp.path()), Some(SHA_B.to_owned()));
    }

    #[test]
    fn test_loose_ref_wins_over_packed_entry() {
        let temp = TempDir::new().unwrap();
        let git = git_dir(temp.path());
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("refs/heads/main"), format!("{SHA_A}\n")).unwrap();
        fs::write(
            git.join("packed-refs"),
            format!("{SHA_B} refs/heads/main\n"),
        )
        .unwrap();

        assert_eq!(resolve_head(temp.path()), Some(SHA_A.to_owned()));
    }

    #[test]
    fn test_unborn_branch_resolves_to_none() {
        // HEAD points to a ref with neither a loose file nor a packed entry
        let temp = TempDir::new().unwrap();
        fs::write(git_dir(temp.path()).join("HEAD"), "ref: refs/heads/main\n").unwrap();

        assert_eq!(resolve_head(temp.path()), None);
    }

    #[test]
    fn test_packed_refs_without_matching_ref() {
        let temp = TempDir::new().unwrap();
        let git = git_dir(temp.path());
        fs::write(git.join("HEAD"), "ref: refs/heads/feature\n").unwrap();
        fs::write(
            git.join("packed-refs"),
            format!("{SHA_A} refs/heads/main\n"),
        )
        .unwrap();

        assert_eq!(resolve_head(temp.path()), None);
    }

    #[test]
    fn test_missing_repository_resolves_to_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(resolve_head(temp.path()), None);
    }

    #[test]
    fn test_unrecognized_head_format_resolves_to_none() {
        let temp = TempDir::new().unwrap();
        fs::write(git_dir(temp.path()).join("HEAD"), "gostak: distims\n").unwrap();

        assert_eq!(resolve_head(temp.path()), None);
    }

    #[test]
    fn test_packed_refs_table_skips_malformed_lines() {
        let packed = format!(
            "# pack-refs with: peeled \n\
             not a ref line\n\
             {SHA_A} refs/heads/main\n\
             deadbeef refs/heads/short-id\n"
        );
        let table = packed_refs_table(&packed);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("refs/heads/main"), Some(&SHA_A.to_owned()));
    }
}
