//! `specgate-verify <contract.json> <project_root>`: positional-only form of `specgate verify`.

use std::process::ExitCode;

fn main() -> ExitCode {
    let code = specgate::run_command("verify");
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}
