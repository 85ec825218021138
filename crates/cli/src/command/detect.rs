use crate::print_stdout;
use crate::DetectArgs;
use anyhow::Result;
use depwarden_deptree::{detect_technologies, DetectedTechnologies};
use depwarden_protocol::{ExitCode, TextTable};
use std::path::Path;

pub fn run(args: DetectArgs) -> Result<ExitCode> {
    let mut detected = DetectedTechnologies::new();
    for dir in super::working_dirs(&args.working_dirs)? {
        for (tech, dirs) in detect_technologies(&dir, args.recursive)? {
            detected.entry(tech).or_default().extend(dirs);
        }
    }
    if detected.is_empty() {
        log::warn!("No supported technology detected");
        return Ok(ExitCode::FailNoOp);
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    print_stdout(&render(&detected, &cwd))?;
    Ok(ExitCode::Success)
}

fn render(detected: &DetectedTechnologies, cwd: &Path) -> String {
    let mut table = TextTable::new(["TECHNOLOGY", "DIRECTORY"]);
    for (tech, dirs) in detected {
        for dir in dirs {
            let shown = dir.strip_prefix(cwd).unwrap_or(dir);
            let shown = if shown.as_os_str().is_empty() {
                ".".to_string()
            } else {
                shown.display().to_string()
            };
            table.push([tech.formal_name().to_string(), shown]);
        }
    }
    table.render()
}
