use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "CCTV feed availability tracker", long_about = None)]
pub struct Cli {
    /// Configuration file, extension optional
    #[arg(long, default_value = "config/default")]
    pub config: String,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    /// Disable the built-in prober even if the configuration enables it
    #[arg(long)]
    pub no_probe: bool,
    /// Load and validate the configuration, then exit
    #[arg(long)]
    pub check_config: bool,
}
