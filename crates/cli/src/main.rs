use std::process::ExitCode;

fn main() -> ExitCode {
    certtrack_cli::run()
}
