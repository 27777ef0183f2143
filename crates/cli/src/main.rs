use std::process::ExitCode;

fn main() -> ExitCode {
    pestquote_cli::run()
}
