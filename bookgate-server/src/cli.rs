//! Terminal mode
//!
//! Drives one IRC connection straight from the command line: a single search,
//! a single download, or an interactive prompt. Shares the IRC client, the DCC
//! fetcher and the listing parser with the gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use bookgate_common::parse_search_results;
use bookgate_common::protocol::{BookDetail, ConnectionRequest, ParseError};

use crate::args::{CliAction, CliArgs, parse_identifier};
use crate::config::{generate_name, validate_name};
use crate::constants::{CLI_WAIT_TIMEOUT_SECS, ERR_NO_RESULTS};
use crate::dcc::{DccFetcher, Fetcher};
use crate::error::CliError;
use crate::irc::{Connector, Event, EventClassifier, EventKind, IrcConnection, IrcConnector, IrcReader};
use crate::session_log::SessionLog;

/// Terminal-mode configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub name: String,
    /// Downloads and logs land here
    pub dir: PathBuf,
    pub log: bool,
    /// IRC server as `host:port`
    pub server: String,
    pub channel: String,
    pub enable_tls: bool,
    pub search_bot: String,
    /// CTCP VERSION reply
    pub user_agent: String,
    /// How long to wait for the bot or a file server to answer
    pub wait: Duration,
}

impl CliConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        if self.search_bot.trim().is_empty() {
            return Err("search bot name must not be empty".to_string());
        }
        Ok(())
    }
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            name: args.name.unwrap_or_else(generate_name),
            dir: args.directory,
            log: args.log,
            server: args.server,
            channel: args.channel,
            enable_tls: !args.no_tls,
            search_bot: args.searchbot,
            user_agent: format!("bookgate cli {}", env!("CARGO_PKG_VERSION")),
            wait: Duration::from_secs(CLI_WAIT_TIMEOUT_SECS),
        }
    }
}

/// Parsed search-results listing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<BookDetail>,
    pub parse_errors: Vec<ParseError>,
}

/// A connected terminal-mode client
pub struct CliClient {
    config: CliConfig,
    fetcher: Arc<dyn Fetcher>,
    irc: IrcConnection,
    reader: IrcReader,
    classifier: EventClassifier,
    log: Option<SessionLog>,
}

impl CliClient {
    /// Connect, register and join the channel
    pub async fn connect(
        config: CliConfig,
        connector: &dyn Connector,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, CliError> {
        let request = ConnectionRequest {
            address: config.server.clone(),
            channel: config.channel.clone(),
            enable_tls: config.enable_tls,
        };
        let (irc, reader) = connector.connect(&config.name, &request).await?;

        let log = if config.log {
            Some(SessionLog::create(&config.name, &config.dir).await?)
        } else {
            None
        };

        info!(
            "connected to {} #{} as {}",
            config.server,
            irc.channel(),
            config.name
        );
        Ok(Self {
            config,
            fetcher,
            irc,
            reader,
            classifier: EventClassifier::new(),
            log,
        })
    }

    pub fn nick(&self) -> &str {
        &self.config.name
    }

    /// Path of the raw traffic log, when logging is enabled
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|log| log.path())
    }

    /// Ask the search bot for `query` and wait for its listing
    pub async fn search(&mut self, query: &str) -> Result<SearchOutcome, CliError> {
        self.irc.search(&self.config.search_bot, query)?;
        info!("search sent, waiting for results");

        let deadline = Instant::now() + self.config.wait;
        loop {
            let event = self.next_event_before(deadline).await?;
            match event.kind {
                EventKind::SearchAccepted => info!("search accepted into the queue"),
                EventKind::MatchesFound => info!("found {} results", event.payload),
                EventKind::NoResults => return Ok(SearchOutcome::default()),
                EventKind::SearchResult => return self.read_listing(&event.payload).await,
                other => debug!("ignoring {:?} while waiting for results", other),
            }
        }
    }

    /// Request a book by its `!server ...` identifier and download it
    pub async fn download(&mut self, identifier: &str) -> Result<PathBuf, CliError> {
        self.irc.request_download(identifier)?;
        info!("download requested, waiting for the file server");

        let deadline = Instant::now() + self.config.wait;
        loop {
            let event = self.next_event_before(deadline).await?;
            match event.kind {
                EventKind::BookResult => {
                    let path = self
                        .fetcher
                        .download_and_extract(&self.config.dir, &event.payload)
                        .await?;
                    return Ok(path);
                }
                EventKind::BadServer => return Err(CliError::BadServer),
                other => debug!("ignoring {:?} while waiting for the book", other),
            }
        }
    }

    /// Read the next raw line. Cancel safe.
    pub async fn read_line(&mut self) -> Result<String, CliError> {
        self.reader
            .next_line()
            .await
            .map_err(CliError::Lost)?
            .ok_or(CliError::Disconnected)
    }

    /// Log and classify a line, answering keepalives and version requests.
    ///
    /// Returns the events callers wait for; everything else yields `None`.
    pub async fn process_line(&mut self, line: &str) -> Result<Option<Event>, CliError> {
        if let Some(log) = &self.log
            && let Err(e) = log.append(line).await
        {
            warn!("unable to write log {}: {}", log.path().display(), e);
        }

        let Some(event) = self.classifier.classify(line) else {
            return Ok(None);
        };
        match event.kind {
            EventKind::Ping => self.irc.pong(&event.payload)?,
            EventKind::Version => {
                self.irc
                    .send_version_info(&event.payload, &self.config.user_agent)?;
            }
            EventKind::ServerList => debug!("file servers online: {}", event.payload),
            _ => return Ok(Some(event)),
        }
        Ok(None)
    }

    async fn next_event_before(&mut self, deadline: Instant) -> Result<Event, CliError> {
        loop {
            let line = timeout_at(deadline, self.read_line())
                .await
                .map_err(|_| CliError::TimedOut(self.config.wait))??;
            if let Some(event) = self.process_line(&line).await? {
                return Ok(event);
            }
        }
    }

    async fn read_listing(&self, text: &str) -> Result<SearchOutcome, CliError> {
        let path = self
            .fetcher
            .download_and_extract(&self.config.dir, text)
            .await?;
        let contents = fs::read(&path).await?;
        if let Err(e) = fs::remove_file(&path).await {
            warn!("error deleting search results file: {}", e);
        }

        let (results, parse_errors) = parse_search_results(&String::from_utf8_lossy(&contents));
        Ok(SearchOutcome {
            results,
            parse_errors,
        })
    }
}

/// A line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptCommand {
    Search(String),
    Download(String),
    Help,
    Quit,
    Nothing,
}

/// Parse one line typed at the prompt
pub fn parse_prompt(line: &str) -> Result<PromptCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => Ok(PromptCommand::Nothing),
        "search" | "s" if rest.is_empty() => Err("usage: search <query>".to_string()),
        "search" | "s" => Ok(PromptCommand::Search(rest.to_string())),
        "download" | "d" if rest.is_empty() => Err("usage: download <!identifier>".to_string()),
        "download" | "d" => parse_identifier(rest).map(PromptCommand::Download),
        "help" | "?" => Ok(PromptCommand::Help),
        "quit" | "exit" | "q" => Ok(PromptCommand::Quit),
        other => Err(format!("unknown command '{}', type 'help'", other)),
    }
}

const PROMPT_HELP: &str = "\
commands:
  search <query>          ask the search bot (s)
  download <!identifier>  fetch one book (d)
  help                    show this text (?)
  quit                    leave (q)";

/// Lines printed for a search outcome
pub fn format_outcome(outcome: &SearchOutcome) -> Vec<String> {
    if outcome.results.is_empty() && outcome.parse_errors.is_empty() {
        return vec![ERR_NO_RESULTS.to_string()];
    }

    let mut lines = vec![format!("{} results:", outcome.results.len())];
    lines.extend(outcome.results.iter().map(|book| book.full.clone()));
    if !outcome.parse_errors.is_empty() {
        lines.push(format!(
            "{} lines could not be parsed",
            outcome.parse_errors.len()
        ));
    }
    lines
}

fn print_outcome(outcome: &SearchOutcome) {
    for line in format_outcome(outcome) {
        println!("{}", line);
    }
}

/// Prompt on stdin until the user quits, stdin closes or IRC goes away
pub async fn run_interactive(client: &mut CliClient) -> Result<(), CliError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("connected as {}", client.nick());
    println!("{}", PROMPT_HELP);

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        // Keep answering PINGs while the user is typing
        let line = loop {
            tokio::select! {
                line = input.next_line() => break line?,
                line = client.read_line() => {
                    let line = line?;
                    if let Some(event) = client.process_line(&line).await? {
                        debug!("ignoring {:?} at the prompt", event.kind);
                    }
                }
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let result = match parse_prompt(&line) {
            Ok(PromptCommand::Search(query)) => client.search(&query).await.map(|outcome| {
                print_outcome(&outcome);
            }),
            Ok(PromptCommand::Download(identifier)) => client
                .download(&identifier)
                .await
                .map(|path| println!("saved {}", path.display())),
            Ok(PromptCommand::Help) => {
                println!("{}", PROMPT_HELP);
                Ok(())
            }
            Ok(PromptCommand::Quit) => return Ok(()),
            Ok(PromptCommand::Nothing) => Ok(()),
            Err(message) => {
                println!("{}", message);
                Ok(())
            }
        };

        match result {
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => println!("error: {}", e),
            Ok(()) => {}
        }
    }
}

/// Entry point for `bookgated cli`
pub async fn run(args: CliArgs) -> Result<(), CliError> {
    let action = args.action.clone();
    let config = CliConfig::from(args);
    config.validate().map_err(CliError::Config)?;
    fs::create_dir_all(&config.dir).await?;

    let mut client =
        CliClient::connect(config, &IrcConnector::new(), Arc::new(DccFetcher::new())).await?;
    if let Some(path) = client.log_path() {
        info!("logging IRC traffic to {}", path.display());
    }

    match action {
        Some(CliAction::Search { query }) => print_outcome(&client.search(&query).await?),
        Some(CliAction::Download { identifier }) => {
            let path = client.download(&identifier).await?;
            println!("saved {}", path.display());
        }
        None => run_interactive(&mut client).await?,
    }
    Ok(())
}
