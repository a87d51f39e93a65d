use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;
use pdfseal::{EncryptionConfig, Error, Permissions, protect_file};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Encrypt a PDF document with AES-256 (revision 6) password protection.",
    arg_required_else_help = true
)]
pub struct Args {
    /// PDF document to protect.
    pub input: PathBuf,

    /// Where to write the protected document.
    pub output: PathBuf,

    /// Password required to open the document.
    #[clap(short = 'u', long = "user-pwd")]
    pub user_password: String,

    /// Password granting full access. Defaults to the user password.
    #[clap(short = 'o', long = "owner-pwd")]
    pub owner_password: Option<String>,

    /// Comma separated capabilities to grant, e.g. "print,copy", or "all". Nothing by default.
    #[clap(long, default_value_t = String::from("none"))]
    pub permit: String,

    /// Leave XMP metadata streams unencrypted.
    #[clap(long)]
    pub no_encrypt_metadata: bool,

    /// First line of the output file.
    #[clap(long, default_value_t = String::from(pdfseal::DEFAULT_HEADER))]
    pub header: String,

    /// Flate-compress unfiltered streams before encryption.
    #[clap(long)]
    pub compress: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    fn config(&self) -> pdfseal::Result<EncryptionConfig> {
        let permissions: Permissions = self.permit.parse()?;
        let mut builder = EncryptionConfig::builder()
            .user_password(self.user_password.as_str())
            .permissions(permissions)
            .encrypt_metadata(!self.no_encrypt_metadata)
            .header(self.header.as_str())
            .compress_streams(self.compress);
        if let Some(owner_password) = &self.owner_password {
            builder = builder.owner_password(owner_password.as_str());
        }
        Ok(builder.build())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = args.config().and_then(|config| {
        debug!("{config:?}");
        protect_file(&args.input, &args.output, &config)
    });

    match result {
        Ok(()) => {
            println!("Successfully saved encrypted PDF as: {}", args.output.display());
            ExitCode::SUCCESS
        }
        Err(Error::InputNotFound { .. }) => {
            eprintln!("Input file not found: {}", args.input.display());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error encrypting PDF: {err}");
            ExitCode::FAILURE
        }
    }
}
