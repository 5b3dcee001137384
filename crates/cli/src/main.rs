use std::process::ExitCode;

fn main() -> ExitCode {
    draftdesk_cli::run()
}
