//! Log file placement, ANSI stripping and clock formatting.
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the cache root that holds one log per command.
const LOG_DIR_NAME: &str = "dotfiles";

/// Remove ANSI CSI sequences (`ESC [ ... final-byte`) from `s`.
///
/// A lone `ESC` not followed by `[` is dropped together with the next
/// character.
pub(super) fn strip_ansi(s: &str) -> String {
    enum Scan {
        Text,
        Escape,
        Csi,
    }

    let mut out = String::with_capacity(s.len());
    let mut scan = Scan::Text;
    for c in s.chars() {
        scan = match (scan, c) {
            (Scan::Text, '\x1b') => Scan::Escape,
            (Scan::Text, c) => {
                out.push(c);
                Scan::Text
            }
            (Scan::Escape, '[') => Scan::Csi,
            (Scan::Escape, _) | (Scan::Csi, '@'..='~') => Scan::Text,
            (Scan::Csi, _) => Scan::Csi,
        };
    }
    out
}

/// Cache root: `$XDG_CACHE_HOME`, else `<home>/.cache`, else `./.cache`.
fn cache_root(xdg_cache_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    xdg_cache_home
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| home.unwrap_or_else(|| PathBuf::from(".")).join(".cache"))
}

fn log_dir_in(cache_root: &Path) -> PathBuf {
    cache_root.join(LOG_DIR_NAME)
}

/// Path of the log for `command`, creating its directory.
///
/// `None` when the directory cannot be created; the run then logs to the
/// console only.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    let dir = log_dir_in(&cache_root(
        std::env::var_os("XDG_CACHE_HOME").map(PathBuf::from),
        home,
    ));
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Run header timestamp, UTC `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Per-line timestamp, UTC `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_drops_color_codes() {
        assert_eq!(
            strip_ansi("\x1b[33mWARN\x1b[0m  conflict ~/.gitconfig"),
            "WARN  conflict ~/.gitconfig"
        );
        assert_eq!(strip_ansi("\x1b[1;34m==>\x1b[0m Links"), "==> Links");
        assert_eq!(strip_ansi("plain"), "plain");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn strip_ansi_drops_cursor_sequences() {
        assert_eq!(strip_ansi("\x1b[2Kdone"), "done");
        assert_eq!(strip_ansi("\x1b[10;2Hx"), "x");
    }

    #[test]
    fn cache_root_prefers_xdg() {
        assert_eq!(
            cache_root(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg")
        );
    }

    #[test]
    fn cache_root_falls_back_to_home_then_cwd() {
        assert_eq!(
            cache_root(Some(PathBuf::new()), Some("/home/u".into())),
            PathBuf::from("/home/u/.cache")
        );
        assert_eq!(cache_root(None, None), PathBuf::from("./.cache"));
    }

    #[test]
    fn logs_live_in_a_dotfiles_directory() {
        assert_eq!(
            log_dir_in(Path::new("/home/u/.cache")),
            PathBuf::from("/home/u/.cache/dotfiles")
        );
    }

    #[test]
    fn timestamps_have_fixed_width() {
        let time = format_utc_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        let datetime = format_utc_datetime();
        assert_eq!(datetime.len(), 19);
        assert_eq!(&datetime[10..11], " ");
    }
}
