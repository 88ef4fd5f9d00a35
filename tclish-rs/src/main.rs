use tclish::cli::{self, CliArgs, USAGE};
use tclish::config;
use tclish::event_loop::{spawn_stdin_reader, EventLoop};
use tclish::script::interp::{fs_loader, Interpreter};
use tclish::script::Task;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TCLISH_LOG";

fn init_logging(debug: bool, default: Option<&str>) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default.unwrap_or("warn")))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &CliArgs, event_loop: &mut EventLoop, is_tty: bool) -> std::io::Result<()> {
    if let Some(path) = &args.script {
        if let Err(e) = event_loop.run_file(path).await? {
            eprintln!("tclish: {e}");
        }
    }
    if let Some(cmd) = &args.command {
        event_loop.run_source(cmd).await?;
    }
    if event_loop.quit_requested() {
        return Ok(());
    }
    if args.interactive() {
        if is_tty && !args.quiet {
            let ver = env!("CARGO_PKG_VERSION");
            println!("tclish {ver}");
            println!("Type `help topics' for help, `exit' to quit.");
        }
        event_loop.run_repl(spawn_stdin_reader()).await
    } else {
        event_loop.run_events().await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("tclish: {e}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    // ── Settings ──────────────────────────────────────────────────────────────
    let mut report = config::load(None);
    init_logging(args.debug, report.settings.log.as_deref());
    report.log();
    let settings = &mut report.settings;
    if let Some(limit) = args.stack_limit {
        settings.stack_limit = limit.min(config::MAX_STACK_LIMIT);
    }
    if args.no_stdlib {
        settings.stdlib = false;
    }

    // ── Interpreter ───────────────────────────────────────────────────────────
    let mut interp = Interpreter::with_config(settings.interp_config());
    interp.file_loader = Some(fs_loader());
    let task = Task::with_base(settings.stack_limit, args.args.clone(), "main");
    let mut event_loop = EventLoop::new(interp, task);

    let is_tty = unsafe {
        libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
    };
    event_loop.set_prompt(settings.prompt.clone(), is_tty);

    // ── Run ───────────────────────────────────────────────────────────────────
    let result = run(&args, &mut event_loop, is_tty).await;

    if let Err(e) = result {
        eprintln!("tclish: {e}");
        std::process::exit(1);
    }
    if event_loop.failed() && !args.interactive() {
        std::process::exit(1);
    }
}
