//! Lookup of bare font file names in the platform's font directories.
//!
//! `--font arial.ttf` is resolved against the usual locations; a path with a
//! directory component is used as given.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Font directories to search on this platform, most specific first.
pub fn font_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if cfg!(target_os = "windows") {
        candidates.push(PathBuf::from(r"C:\Windows\Fonts"));
    } else if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from("/System/Library/Fonts"));
        candidates.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("Library/Fonts"));
        }
    } else {
        candidates.push(PathBuf::from("/usr/share/fonts"));
        candidates.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".fonts"));
        }
        if let Some(user) = dirs::font_dir() {
            candidates.push(user);
        }
    }
    candidates
}

/// Levels below a font directory that are searched. Debian-style layouts
/// put files at `/usr/share/fonts/truetype/<family>/<file>`.
const SEARCH_DEPTH: usize = 3;

/// Find `filename` in the system font directories, case-insensitively.
pub fn find_system_font(filename: &str) -> Option<PathBuf> {
    find_in_dirs(filename, &font_dirs())
}

/// First match across `roots`, in order. Within one root an exact-case match
/// beats a case-insensitive one.
fn find_in_dirs(filename: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    roots.iter().find_map(|root| find_under(filename, root))
}

fn find_under(filename: &str, root: &Path) -> Option<PathBuf> {
    let mut folded = None;
    let files = WalkDir::new(root)
        .min_depth(1)
        .max_depth(SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() || e.path().is_file());
    for entry in files {
        let (exact, similar) = {
            let name = entry.file_name().to_string_lossy();
            (name == filename, name.eq_ignore_ascii_case(filename))
        };
        if exact {
            return Some(entry.into_path());
        }
        if similar && folded.is_none() {
            folded = Some(entry.into_path());
        }
    }
    folded
}

/// Turn a `--font` argument into a path.
///
/// Bare file names are looked up in the system font directories; when the
/// lookup fails, or the argument has a directory part, it is returned as-is.
pub fn resolve_font_path(arg: &str) -> PathBuf {
    let path = Path::new(arg);
    let is_bare = !path.is_absolute() && path.file_name().is_some_and(|n| n == path.as_os_str());
    if is_bare {
        if let Some(found) = find_system_font(arg) {
            return found;
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_exact_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Mono.ttf"), b"x").unwrap();
        let found = find_in_dirs("Mono.ttf", &[tmp.path().to_path_buf()]);
        assert_eq!(found, Some(tmp.path().join("Mono.ttf")));
    }

    #[test]
    fn matches_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("DejaVuSans.TTF"), b"x").unwrap();
        let found = find_in_dirs("dejavusans.ttf", &[tmp.path().to_path_buf()]);
        assert_eq!(
            found.map(|p| p.file_name().unwrap().to_string_lossy().to_lowercase()),
            Some("dejavusans.ttf".to_string())
        );
    }

    #[test]
    fn searches_one_level_of_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("truetype");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Serif.ttf"), b"x").unwrap();
        let found = find_in_dirs("Serif.ttf", &[tmp.path().to_path_buf()]);
        assert_eq!(found, Some(nested.join("Serif.ttf")));
    }

    #[test]
    fn finds_fonts_two_levels_down() {
        let tmp = TempDir::new().unwrap();
        let family = tmp.path().join("truetype").join("dejavu");
        fs::create_dir_all(&family).unwrap();
        fs::write(family.join("DejaVuSans.ttf"), b"x").unwrap();
        let found = find_in_dirs("dejavusans.TTF", &[tmp.path().to_path_buf()]);
        assert_eq!(found, Some(family.join("DejaVuSans.ttf")));
    }

    #[test]
    fn exact_case_wins_within_a_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a.TTF"), b"x").unwrap();
        fs::write(tmp.path().join("b").join("a.ttf"), b"x").unwrap();
        let found = find_in_dirs("a.ttf", &[tmp.path().to_path_buf()]);
        assert_eq!(found, Some(tmp.path().join("b").join("a.ttf")));
    }

    #[test]
    fn earlier_roots_win() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("Mono.ttf"), b"x").unwrap();
        fs::create_dir_all(first.path().join("x/y")).unwrap();
        fs::write(first.path().join("x/y/Mono.ttf"), b"x").unwrap();
        let roots = [first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_in_dirs("Mono.ttf", &roots),
            Some(first.path().join("x/y/Mono.ttf"))
        );
    }

    #[test]
    fn stops_below_the_search_depth() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("a/b/c/d");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("Deep.ttf"), b"x").unwrap();
        assert_eq!(find_in_dirs("Deep.ttf", &[tmp.path().to_path_buf()]), None);
    }

    #[test]
    fn missing_font_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_in_dirs("nope.ttf", &[tmp.path().to_path_buf()]), None);
    }

    #[test]
    fn resolve_keeps_paths_with_directories() {
        assert_eq!(
            resolve_font_path("fonts/custom.ttf"),
            PathBuf::from("fonts/custom.ttf")
        );
        assert_eq!(
            resolve_font_path("/opt/fonts/custom.ttf"),
            PathBuf::from("/opt/fonts/custom.ttf")
        );
    }

    #[test]
    fn resolve_unknown_bare_name_falls_through() {
        let name = "no-such-font-anywhere-3f9a.ttf";
        assert_eq!(resolve_font_path(name), PathBuf::from(name));
    }
}
