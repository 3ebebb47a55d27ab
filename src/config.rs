//! Command line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::{
    lister::{ListerOptions, ProbePath},
    playlist::PlaylistOptions,
    resolver::ResolverOptions,
    store::github::{GitHubConfig, DEFAULT_API_URL},
    util::HttpOptions,
    ytdlp::YtDlpOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Run the yt-dlp program
    YtDlp,
    /// Scrape the watch pages over HTTP
    WatchPage,
}

/// Publishes a playlist of the live and upcoming streams of a list of channels
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Token for the repository holding the channel list and playlist
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository as `owner/name`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    #[arg(long, env = "PLAYLIST_BRANCH", default_value = "main")]
    pub branch: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Read and write files in this directory instead of a repository
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Channel list, one `name,url` or bare URL per line
    #[arg(long, default_value = "nkyt.txt")]
    pub input: String,

    #[arg(long, default_value = "playlist.m3u")]
    pub output: String,

    #[arg(long, value_enum, default_value_t = Backend::YtDlp)]
    pub backend: Backend,

    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    pub ytdlp_path: PathBuf,

    /// Format selector handed to yt-dlp for the fallback URL
    #[arg(long, default_value = "best")]
    pub ytdlp_format: String,

    /// YouTube player clients yt-dlp should impersonate
    #[arg(long, value_delimiter = ',', default_values = ["ios", "mweb"])]
    pub player_client: Vec<String>,

    /// Netscape cookie file, used when it exists
    #[arg(long, default_value = "cookies.txt")]
    pub cookies: PathBuf,

    #[arg(long, value_enum, value_delimiter = ',', default_values = ["home", "live", "streams"])]
    pub probe_path: Vec<ProbePath>,

    /// Videos to inspect per probed page
    #[arg(long, default_value_t = 5)]
    pub playlist_end: usize,

    /// Seconds before a single request or extractor run is abandoned
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Retries for transient transport failures
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Put every entry in this group instead of one group per channel
    #[arg(long)]
    pub group_title: Option<String>,

    /// Leave scheduled broadcasts out of the playlist
    #[arg(long)]
    pub live_only: bool,

    /// List broadcasts the extractor reports as "not started yet" as upcoming
    #[arg(long)]
    pub scheduled_error_as_upcoming: bool,

    /// Print the playlist instead of publishing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    GitHub(GitHubConfig),
    Local(PathBuf),
}

/// Everything a single run needs apart from its collaborators.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: String,
    pub output: String,
    pub lister: ListerOptions,
    pub resolver: ResolverOptions,
    pub playlist: PlaylistOptions,
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: "nkyt.txt".to_string(),
            output: "playlist.m3u".to_string(),
            lister: ListerOptions::default(),
            resolver: ResolverOptions::default(),
            playlist: PlaylistOptions::default(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: Option<StoreConfig>,
    pub backend: Backend,
    pub http: HttpOptions,
    pub ytdlp: YtDlpOptions,
    pub cookies: Option<PathBuf>,
    pub run: RunConfig,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Args {
    pub fn into_config(self) -> Config {
        let store = match (self.local_dir, non_empty(self.token), non_empty(self.repository)) {
            (Some(dir), _, _) => Some(StoreConfig::Local(dir)),
            (None, Some(token), Some(repository)) => Some(StoreConfig::GitHub(GitHubConfig {
                token,
                repository,
                branch: self.branch,
                api_url: self.api_url,
            })),
            _ => None,
        };

        let timeout = Duration::from_secs(self.timeout.max(1));
        let cookies = Some(self.cookies).filter(|p| p.is_file());

        Config {
            store,
            backend: self.backend,
            http: HttpOptions {
                timeout,
                max_retries: self.retries,
            },
            ytdlp: YtDlpOptions {
                program: self.ytdlp_path,
                cookies: cookies.clone(),
                player_clients: self
                    .player_client
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
                format: self.ytdlp_format,
                timeout,
                max_retries: self.retries as usize,
            },
            cookies,
            run: RunConfig {
                input: self.input,
                output: self.output,
                lister: ListerOptions {
                    probe_paths: self.probe_path,
                    limit: self.playlist_end.max(1),
                },
                resolver: ResolverOptions {
                    live_only: self.live_only,
                    scheduled_error_as_upcoming: self.scheduled_error_as_upcoming,
                },
                playlist: PlaylistOptions {
                    group_title: non_empty(self.group_title),
                },
                dry_run: self.dry_run,
            },
        }
    }
}
