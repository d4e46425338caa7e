//! In-sandbox entry scripts

use serde::{Deserialize, Serialize};

/// File name the user's source is written under
pub const ENTRY_MODULE: &str = "code_user.py";

/// File name of the generated entry script
pub const RUNNER_SCRIPT: &str = "runner.py";

/// Workspace subdirectory figures are saved into
pub const ARTIFACT_DIR: &str = "_plots";

/// Which entry script a runtime gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Run the entry module, nothing else (slim images have no matplotlib)
    Plain,
    /// Headless matplotlib, `show()` saves figures, plus a final save pass
    CaptureFigures,
}

const PLAIN_RUNNER: &str = r#"import runpy

runpy.run_path("code_user.py", run_name="__main__")
"#;

const CAPTURE_RUNNER: &str = r#"import os
import runpy

try:
    import matplotlib
    matplotlib.use("Agg")
    import matplotlib.pyplot as plt
except Exception:
    plt = None

_saved = 0


def _save_figs():
    global _saved
    if plt is None:
        return
    nums = plt.get_fignums()
    if not nums:
        return
    os.makedirs("_plots", exist_ok=True)
    for n in nums:
        _saved += 1
        plt.figure(n).savefig(os.path.join("_plots", f"plot_{_saved}.png"), bbox_inches="tight")
    plt.close("all")


if plt is not None:
    def _show(*args, **kwargs):
        _save_figs()

    plt.show = _show

try:
    runpy.run_path("code_user.py", run_name="__main__")
finally:
    _save_figs()
"#;

/// Entry script text for a runner kind
pub fn runner_script(kind: RunnerKind) -> &'static str {
    match kind {
        RunnerKind::Plain => PLAIN_RUNNER,
        RunnerKind::CaptureFigures => CAPTURE_RUNNER,
    }
}
