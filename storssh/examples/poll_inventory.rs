//! Inventory poll: connect to one array, run a command, print records.
//!
//! Runs the same command from several tasks at once to show the pool
//! bounding concurrent sessions, then parses the output with the chosen
//! layout.
//!
//! # Usage
//!
//! Bracketed `Label [value]` output over the interactive shell:
//! ```bash
//! cargo run --example poll_inventory -- --host 10.0.0.5 --user monitor --password secret \
//!     --command "show disks" --layout bracket --prompt "CLI>" --interactive
//! ```
//!
//! Colon-delimited table over exec:
//! ```bash
//! cargo run --example poll_inventory -- --host 10.0.0.6 --user monitor --key ~/.ssh/id_ed25519 \
//!     --command "lsmdisk -delim :" --layout table --delimiter :
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use storssh::parser::{LayoutKind, ParseSpec, RecordParser};
use storssh::{CommandExecutor, DeviceEndpoint, DeviceProfile, ExecOptions, SessionPool};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for pool and retry detail)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = DeviceEndpoint::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .connect_timeout(Duration::from_secs(args.timeout))
        .max_pool_size(args.pool_size);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let endpoint = builder.build()?;
    let mut profile = DeviceProfile::new("cli").with_soft_failure("Inapplicable");
    if let Some(prompt) = &args.prompt {
        profile = profile.with_prompt(prompt)?;
    }

    let spec = ParseSpec::from_kind(args.layout.parse::<LayoutKind>()?, &args.delimiter)?;
    let options = ExecOptions::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_interactive(args.interactive);

    let pool = SessionPool::ssh(endpoint);
    let executor = CommandExecutor::new(pool.clone(), profile);

    println!(
        "Polling {} with {} concurrent runs (pool size {})...",
        args.host, args.runs, args.pool_size
    );

    let mut tasks = Vec::new();
    for _ in 0..args.runs {
        let executor = executor.clone();
        let options = options.clone();
        let command = args.command.clone();
        tasks.push(tokio::spawn(async move {
            executor.run(command.as_str(), &options).await
        }));
    }

    let parser = RecordParser::new();
    for (i, task) in tasks.into_iter().enumerate() {
        let response = match task.await? {
            Ok(response) => response,
            Err(e) => {
                eprintln!("run {}: {}", i, e);
                continue;
            }
        };

        println!("{}", "-".repeat(50));
        println!(
            "run {}: {} in {:?} ({} attempt(s), {})",
            i, response.command, response.elapsed, response.attempts, response.session_id
        );

        if response.is_empty_result() {
            println!("no data");
            continue;
        }

        let records = parser.parse(&response.text, &spec);
        for (n, record) in records.iter().enumerate() {
            println!("record {}:", n);
            for (key, value) in record.iter() {
                println!("  {:<30} {}", key, value);
            }
        }
    }

    println!("{}", "-".repeat(50));
    println!("Pool: {:?}", pool.status());
    pool.shutdown().await;

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    command: String,
    layout: String,
    delimiter: String,
    prompt: Option<String>,
    interactive: bool,
    pool_size: usize,
    runs: usize,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            key: None,
            timeout: 30,
            command: "show disks".to_string(),
            layout: "bracket".to_string(),
            delimiter: ":".to_string(),
            prompt: None,
            interactive: false,
            pool_size: 2,
            runs: 3,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                "--command" | "-c" => parsed.command = value.unwrap_or(parsed.command),
                "--layout" | "-l" => parsed.layout = value.unwrap_or(parsed.layout),
                "--delimiter" | "-d" => parsed.delimiter = value.unwrap_or(parsed.delimiter),
                "--prompt" => parsed.prompt = value,
                "--pool-size" => {
                    parsed.pool_size = value.and_then(|v| v.parse().ok()).unwrap_or(2)
                }
                "--runs" => parsed.runs = value.and_then(|v| v.parse().ok()).unwrap_or(3),
                "--interactive" | "-i" => {
                    parsed.interactive = true;
                    i += 1;
                    continue;
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"storssh poll_inventory example

USAGE:
    cargo run --example poll_inventory -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Target array [default: localhost]
    -p, --port <PORT>          SSH port [default: 22]
    -u, --user <USER>          Username [default: $USER]
    -P, --password <PASS>      Password for authentication
    -k, --key <PATH>           Path to SSH private key
    -t, --timeout <SECS>       Connect and command timeout [default: 30]
    -c, --command <CMD>        Command to run [default: show disks]
    -l, --layout <LAYOUT>      keyvalue, bracket or table [default: bracket]
    -d, --delimiter <DELIM>    Key/value separator or table delimiter [default: :]
        --prompt <REGEX>       Shell prompt pattern
    -i, --interactive          Use the interactive shell instead of exec
        --pool-size <N>        Sessions per array [default: 2]
        --runs <N>             Concurrent runs [default: 3]
    --help                     Print this help message
"#
        );
    }
}
