use std::process::ExitCode;

use hostingde_deploy::Pipeline;
use hostingde_deploy::actions::ActionsIo;

fn main() -> ExitCode {
    let pipeline = Pipeline::from_args();

    env_logger::Builder::new()
        .filter_level(pipeline.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();

    match pipeline.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            log::error!("{message}");
            if let Err(e) = ActionsIo::from_env().fail(&message) {
                log::error!("cannot report failure to the runner: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
