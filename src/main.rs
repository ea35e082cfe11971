use apod_tui::app::{self, RunOptions};

enum Mode {
    Tui,
    Dump,
    Exit,
}

fn main() {
    let (mode, options) = match handle_cli_flags(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let result = match mode {
        Mode::Exit => return,
        Mode::Dump => app::dump(options, &mut std::io::stdout().lock()),
        Mode::Tui => app::run_with(options),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags(mut args: impl Iterator<Item = String>) -> Result<(Mode, RunOptions), String> {
    let mut mode = Mode::Tui;
    let mut options = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("APOD-TUI {}", apod_tui::VERSION);
                mode = Mode::Exit;
            }
            "--help" | "-h" => {
                println!(
                    "APOD-TUI — Browse Astronomy Picture of the Day from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --feed-url <URL>     Load the feed from URL instead of the configured one\n  --config <PATH>      Read configuration from PATH\n  --offline            Use the built-in sample feed\n  --dump               Print the newest entries and exit"
                );
                mode = Mode::Exit;
            }
            "--feed-url" => {
                let url = args.next().ok_or("--feed-url needs a value")?;
                options.feed_url = Some(url);
            }
            "--config" => {
                let path = args.next().ok_or("--config needs a value")?;
                options.config_file = Some(path.into());
            }
            "--offline" => options.offline = true,
            "--dump" => {
                if !matches!(mode, Mode::Exit) {
                    mode = Mode::Dump;
                }
            }
            other => {
                if let Some(url) = other.strip_prefix("--feed-url=") {
                    options.feed_url = Some(url.to_string());
                } else {
                    return Err(format!("unknown argument: {other} (see --help)"));
                }
            }
        }
    }
    Ok((mode, options))
}
