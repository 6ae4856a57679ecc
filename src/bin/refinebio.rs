use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use refinebio::client::Api;
use refinebio::config::ConfigLoader;
use refinebio::describe::describe;
use refinebio::download::{Confirm, TerminalConfirm};
use refinebio::error::RefineError;
use refinebio::models::Token;
use refinebio::workflow::{self, DatasetDownload, DatasetOutcome};

#[derive(Parser)]
#[command(name = "refinebio")]
#[command(about = "Search, build and download refine.bio datasets and compendia")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show documentation for a type, method or function")]
    Describe {
        /// e.g. `Sample`, `Sample.get` or "Sample get"
        entity: Option<String>,
    },
    #[command(about = "Build a dataset, wait for processing and download it")]
    DownloadDataset(DatasetArgs),
    #[command(about = "Download the latest compendium for an organism")]
    DownloadCompendium(CompendiumArgs),
    #[command(about = "Download the latest RNA-seq sample compendium for an organism")]
    DownloadQuantfileCompendium(QuantfileArgs),
    #[command(about = "Create, activate and save an API token")]
    CreateToken {
        /// Skip the terms and conditions prompt
        #[arg(short, long)]
        silent: bool,
    },
}

#[derive(Args)]
struct DatasetArgs {
    #[arg(long)]
    email_address: Option<String>,

    #[arg(long)]
    path: PathBuf,

    /// JSON object of experiment accession codes to sample accession codes
    #[arg(long, value_parser = parse_dataset_dict)]
    dataset_dict: Option<BTreeMap<String, Vec<String>>>,

    /// Space separated experiment accession codes
    #[arg(long)]
    experiments: Option<String>,

    #[arg(long, default_value = "EXPERIMENT")]
    aggregation: String,

    #[arg(long, default_value = "NONE")]
    transformation: String,

    #[arg(long)]
    skip_quantile_normalization: bool,

    /// Give up waiting after this long, e.g. `90`, `30s`, `15m`, `2h`
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[arg(long)]
    notify_me: bool,
}

#[derive(Args)]
struct CompendiumArgs {
    #[arg(long)]
    organism: String,

    #[arg(long)]
    path: PathBuf,

    #[arg(long)]
    quant_sf_only: bool,
}

#[derive(Args)]
struct QuantfileArgs {
    #[arg(long)]
    organism: String,

    #[arg(long)]
    path: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<RefineError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RefineError) -> u8 {
    match error {
        RefineError::NotFound { .. }
        | RefineError::MissingFile(_)
        | RefineError::InvalidArgument(_)
        | RefineError::ConfigRead(_) => 2,
        RefineError::ServerError(_)
        | RefineError::Http { .. }
        | RefineError::Transport(_)
        | RefineError::Decode(_) => 3,
        RefineError::MultipleErrors(errors) => errors.first().map_or(1, map_exit_code),
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Describe { entity } = &cli.command {
        match describe(entity.as_deref()) {
            Some(doc) => println!("{doc}"),
            None => println!(
                "could not find class or attribute: {}",
                entity.as_deref().unwrap_or_default()
            ),
        }
        return Ok(());
    }

    let config = ConfigLoader::resolve()?;
    let api = Api::new(config)?;
    let confirm: &dyn Confirm = &TerminalConfirm;

    match cli.command {
        Commands::Describe { .. } => Ok(()),
        Commands::DownloadDataset(args) => run_download_dataset(&api, args, confirm),
        Commands::DownloadCompendium(args) => {
            let downloaded = workflow::download_compendium(
                &api,
                &args.path,
                &args.organism,
                args.quant_sf_only,
                Some(confirm),
            )?;
            report_download(downloaded.as_deref());
            Ok(())
        }
        Commands::DownloadQuantfileCompendium(args) => {
            let downloaded = workflow::download_quantfile_compendium(
                &api,
                &args.path,
                &args.organism,
                Some(confirm),
            )?;
            report_download(downloaded.as_deref());
            Ok(())
        }
        Commands::CreateToken { silent } => run_create_token(&api, silent, confirm),
    }
}

fn run_download_dataset(
    api: &Api,
    args: DatasetArgs,
    confirm: &dyn Confirm,
) -> miette::Result<()> {
    let mut request = DatasetDownload::new(args.path);
    request.email_address = args.email_address;
    request.dataset_dict = args.dataset_dict;
    request.experiments = args
        .experiments
        .as_deref()
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    request.aggregation = args.aggregation;
    request.transformation = args.transformation;
    request.skip_quantile_normalization = args.skip_quantile_normalization;
    request.timeout = args.timeout;
    request.notify_me = args.notify_me;

    match workflow::download_dataset(api, &request, Some(confirm))? {
        DatasetOutcome::Downloaded(path) => report_download(Some(&path)),
        DatasetOutcome::Declined => report_download(None),
        DatasetOutcome::TimedOut { id } => println!(
            "Dataset {id} is still processing. Download it later with Dataset::get(&api, \"{id}\")."
        ),
    }
    Ok(())
}

fn run_create_token(api: &Api, silent: bool, confirm: &dyn Confirm) -> miette::Result<()> {
    let mut token = Token::create(api)?;
    if !silent {
        if let Some(terms) = token.terms_and_conditions() {
            println!("{terms}\n");
        }
        let agreed = confirm.confirm(
            "Do you agree to the refine.bio Terms of Use (https://www.refine.bio/terms) \
             and Privacy Policy (https://www.refine.bio/privacy)?",
        );
        if !agreed {
            println!("Token was not activated.");
            return Ok(());
        }
    }

    token.agree_to_terms_and_conditions()?;
    token.save()?;
    println!(
        "Created token {} and saved it to {}",
        token.id().unwrap_or_default(),
        api.config().path.display()
    );
    Ok(())
}

fn report_download(path: Option<&Path>) {
    match path {
        Some(path) => println!("Downloaded to {}", path.display()),
        None => println!("Download cancelled."),
    }
}

fn parse_dataset_dict(raw: &str) -> Result<BTreeMap<String, Vec<String>>, String> {
    serde_json::from_str(raw).map_err(|_| format!("expected a JSON object of lists, got: {raw}"))
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    workflow::parse_timeout(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_dict_parses_json_objects() {
        let dict = parse_dataset_dict(r#"{"GSE1": ["ALL"], "GSE2": ["GSM1", "GSM2"]}"#).unwrap();
        assert_eq!(dict["GSE2"], vec!["GSM1", "GSM2"]);
        assert!(parse_dataset_dict("GSE1").is_err());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            map_exit_code(&RefineError::NotFound {
                url: "x".to_string()
            }),
            2
        );
        assert_eq!(map_exit_code(&RefineError::ServerError(None)), 3);
        assert_eq!(map_exit_code(&RefineError::BadRequest("x".to_string())), 1);
    }

    #[test]
    fn cli_parses_download_dataset() {
        let cli = Cli::try_parse_from([
            "refinebio",
            "download-dataset",
            "--path",
            "out.zip",
            "--experiments",
            "GSE1 GSE2",
            "--timeout",
            "15m",
        ])
        .unwrap();
        let Commands::DownloadDataset(args) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.experiments.as_deref(), Some("GSE1 GSE2"));
        assert_eq!(args.timeout, Some(Duration::from_secs(900)));
        assert_eq!(args.aggregation, "EXPERIMENT");
    }
}
