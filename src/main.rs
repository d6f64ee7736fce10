use std::path::PathBuf;

use readable_tui::app::RunOptions;

const HELP: &str = "readable-tui: read and discuss posts on a Readable board from the terminal.

Usage: readable-tui [--offline] [--path <route>] [--config <file>]

  --offline            Use a built-in sample board instead of the server
  --path <route>       Start at /, /:category or /:category/:post_id
  --config <file>      Read configuration from <file>
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Cli {
    Run(RunOptions),
    Exit,
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Cli::Run(options)) => options,
        Ok(Cli::Exit) => return,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    if let Err(err) = readable_tui::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut options = RunOptions::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("readable-tui {}", readable_tui::VERSION);
                return Ok(Cli::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Cli::Exit);
            }
            "--offline" => options.offline = true,
            "--path" => {
                let value = args.next().ok_or("--path needs a route")?;
                options.path = Some(value);
            }
            "--config" => {
                let value = args.next().ok_or("--config needs a file")?;
                options.config_file = Some(PathBuf::from(value));
            }
            other => {
                if let Some(value) = other.strip_prefix("--path=") {
                    options.path = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--config=") {
                    options.config_file = Some(PathBuf::from(value));
                } else {
                    return Err(format!("unknown argument '{other}'"));
                }
            }
        }
    }
    Ok(Cli::Run(options))
}
