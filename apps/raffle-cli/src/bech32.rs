use std::path::PathBuf;
use std::process::Command;

use raffle_engine::convert::{AddressConverter, Conversion};

/// Runs an external program as `<program> <address>` and takes the first line it prints.
pub struct ScriptConverter {
    program: PathBuf,
}

impl ScriptConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AddressConverter for ScriptConverter {
    fn convert(&self, raw: &str) -> Conversion {
        let output = match Command::new(&self.program).arg(raw).output() {
            Ok(output) => output,
            Err(e) => {
                return Conversion::Unavailable {
                    reason: format!("could not run {}: {}", self.program.display(), e),
                }
            }
        };
        if !output.status.success() {
            return Conversion::Unavailable {
                reason: format!("{} exited with {}", self.program.display(), output.status),
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().next().map(str::trim).filter(|line| !line.is_empty()) {
            Some(line) => Conversion::Converted(line.to_string()),
            None => Conversion::Unavailable {
                reason: format!("{} printed nothing", self.program.display()),
            },
        }
    }
}
