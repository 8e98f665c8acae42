use std::path::{Path, PathBuf};

/// Expand `~`, `$VAR` and `${VAR}` in a user-supplied path.
///
/// Paths that fail to expand (unknown variable) are returned unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_plain_path_when_expanding_then_unchanged() {
        assert_eq!(
            expand_path(Path::new("data/org.csv")),
            PathBuf::from("data/org.csv")
        );
    }

    #[test]
    fn given_unknown_variable_when_expanding_then_returns_input() {
        let path = Path::new("$ORGSYNC_SURELY_UNSET_VARIABLE/org.csv");
        assert_eq!(expand_path(path), path.to_path_buf());
    }
}
