use std::process::ExitCode;

fn main() -> ExitCode {
    let code = specgate::run();
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}
