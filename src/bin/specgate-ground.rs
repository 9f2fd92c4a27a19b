//! `specgate-ground <spec.md> <project_root>`: positional-only form of `specgate ground`.

use std::process::ExitCode;

fn main() -> ExitCode {
    let code = specgate::run_command("ground");
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}
