use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Progress bars on stderr, summary on stdout.
    Text,
    /// One ProgressEvent per line on stdout.
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "fanline", version, about = "Fan a request out to concurrent browser agents")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default lookup.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, group = "input")]
    pub request: Option<String>,

    #[arg(long, group = "input")]
    pub request_file: Option<String>,

    #[arg(long, group = "input")]
    pub stdin: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Overrides `pipeline.max_tasks`.
    #[arg(long)]
    pub max_tasks: Option<usize>,

    /// Overrides `pipeline.task_timeout_secs`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Defaults to `http_server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Defaults to `http_server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Run(RunArgs),
    Serve(ServeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_parse() {
        let args = Args::try_parse_from([
            "fanline",
            "run",
            "--request",
            "rust async runtimes",
            "--format",
            "jsonl",
            "--max-tasks",
            "4",
        ])
        .unwrap();
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.request.as_deref(), Some("rust async runtimes"));
        assert_eq!(run.format, OutputFormat::Jsonl);
        assert_eq!(run.max_tasks, Some(4));
        assert_eq!(run.timeout_secs, None);
    }

    #[test]
    fn request_sources_are_exclusive() {
        let err = Args::try_parse_from([
            "fanline",
            "run",
            "--request",
            "a",
            "--stdin",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn serve_defaults_come_from_config() {
        let args = Args::try_parse_from(["fanline", "serve", "--port", "9000"]).unwrap();
        let Commands::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.host, None);
        assert_eq!(serve.port, Some(9000));
    }
}
