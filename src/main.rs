use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use tlsdays::config::{Config, Settings};
use tlsdays::logger::init_logger;
use tlsdays::{check, ConnectionTarget, Error, InputError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hostname or https:// URL to check
    host: Option<String>,

    /// Port to connect to, overrides a port in the URL (default: 443)
    port: Option<String>,

    /// Print certificate details along with the day count
    #[arg(long)]
    debug: bool,

    /// Output format: text, json
    #[arg(short, long)]
    output: Option<String>,

    /// Connect and read timeout in seconds (default: 30)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Load settings from a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (default: warn)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

impl Args {
    fn as_config(&self) -> Config {
        Config {
            port: None,
            timeout: self.timeout,
            debug: if self.debug { Some(true) } else { None },
            output: self.output.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                exit(1);
            }
        },
    };

    if args.generate_config {
        print!("{}", Config::example_toml());
        exit(0);
    }

    if let Err(err) = run(&args) {
        if let Error::Input(InputError::MissingHostname) = err {
            eprintln!("Usage: tlsdays <HOST> [PORT] [--debug]");
        } else {
            eprintln!("{}", err);
        }
        exit(err.exit_code());
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let settings = load_settings(args)?;
    init_logger(&settings.log_level);
    debug!("resolved settings: {:?}", settings);

    let host = args.host.as_deref().ok_or(InputError::MissingHostname)?;
    let target = ConnectionTarget::parse(host, args.port.as_deref(), settings.port)?;

    let report = check(&target, &settings.connect_options(), chrono::Utc::now())?;
    println!("{}", report.render(settings.output, settings.debug)?);
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings, Error> {
    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    Ok(file_config.merge_with(args.as_config()).resolve()?)
}
