use std::process::ExitCode;

use clap::Parser;
use live_playlist::{
    config::{Args, Backend, StoreConfig},
    extractor::Extractor,
    pipeline::{self, RunOutcome},
    store::{github::GitHubStore, local::LocalStore, RemoteStore},
    util::HttpClient,
    watch_page::WatchPageExtractor,
    ytdlp::YtDlpExtractor,
};
use log::{error, info, warn};

const EXIT_NOT_CONFIGURED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();

    let Some(store_config) = config.store.clone() else {
        error!("Nothing to do: set GH_TOKEN and GITHUB_REPOSITORY, or pass --local-dir");
        return ExitCode::from(EXIT_NOT_CONFIGURED);
    };

    // Create HttpClient
    let client = match HttpClient::new(&config.http) {
        Ok(client) => client,
        Err(e) => {
            error!("Could not create HttpClient: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(cookies) = &config.cookies {
        match client.load_cookie_file(cookies) {
            Ok(n) => info!("Loaded {} cookie(s) from {}", n, cookies.display()),
            Err(e) => warn!("Could not load cookies from {}: {}", cookies.display(), e),
        }
    }

    let store: Box<dyn RemoteStore> = match store_config {
        StoreConfig::GitHub(github) => {
            info!("Using {}@{}", github.repository, github.branch);
            Box::new(GitHubStore::new(client.clone(), github))
        }
        StoreConfig::Local(dir) => {
            info!("Using local directory {}", dir.display());
            Box::new(LocalStore::new(dir))
        }
    };

    let extractor: Box<dyn Extractor> = match config.backend {
        Backend::YtDlp => Box::new(YtDlpExtractor::new(config.ytdlp.clone())),
        Backend::WatchPage => Box::new(WatchPageExtractor::new(client)),
    };

    match pipeline::run(&config.run, extractor.as_ref(), store.as_ref()).await {
        Ok(report) => {
            if let RunOutcome::DryRun(playlist) = report.outcome {
                print!("{}", playlist.text);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
