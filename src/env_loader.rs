use std::env;
use std::path::{Path, PathBuf};

const DOTENV: &str = ".env";
const HOME_SUBDIR: &str = ".channel-reaper";

/// `.env` locations in lookup order. Only the first one that exists is read.
fn dotenv_candidates(
    cwd: Option<PathBuf>,
    reaper_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Vec<PathBuf> {
    let reaper_home = reaper_home.filter(|p| !p.as_os_str().is_empty());
    let home_fallback = match reaper_home {
        Some(dir) => Some(dir.join(DOTENV)),
        None => home_dir.map(|home| home.join(HOME_SUBDIR).join(DOTENV)),
    };
    cwd.map(|dir| dir.join(DOTENV))
        .into_iter()
        .chain(home_fallback)
        .collect()
}

fn load_first(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .filter(|path| path.is_file())
        .find(|path| dotenvy::from_path(path).is_ok())
        .cloned()
}

/// Populates the process environment from the first readable `.env`.
/// Variables already set win. Returns the file that was used, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    let candidates = dotenv_candidates(
        env::current_dir().ok(),
        env::var_os("REAPER_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );
    load_first(&candidates)
}

pub fn describe(loaded: Option<&Path>) -> String {
    loaded.map_or_else(|| "<none>".to_string(), |p| p.display().to_string())
}
