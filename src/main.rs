use clap::{App, AppSettings, Arg, SubCommand};
use craftercoder::build::build_site;
use craftercoder::config::Config;
use log::error;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("craftercoder")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("The output directory (default: `_site` next to the project file)"),
                )
                .arg(
                    Arg::with_name("project")
                        .value_name("PROJECT_DIR")
                        .default_value(".")
                        .help("A directory inside the project"),
                ),
        )
        .get_matches();

    if let ("build", Some(matches)) = matches.subcommand() {
        let project = Path::new(matches.value_of("project").unwrap_or("."));
        let output = matches.value_of("output").map(Path::new);
        if let Err(err) = build(project, output) {
            error!("{}", chain(err.as_ref()));
            std::process::exit(1);
        }
    }
}

fn build(project: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = Config::from_directory(project, output)?;
    build_site(&config)?;
    Ok(())
}

/// Formats `err` followed by each of its sources, e.g. `a: b: c`. Errors that
/// already print their source (like annotated parse errors) are not repeated.
fn chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        let text = err.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = err.source();
    }
    message
}
