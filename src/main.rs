use std::process::ExitCode;

fn main() -> ExitCode {
    match rheo_fit::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rheofit: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
