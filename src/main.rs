use catalog_dash::app;
use catalog_dash::cli::Args;

fn main() {
    let args = Args::parse_args();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    let stdout = std::io::stdout();
    if let Err(e) = app::run(&args, &mut stdout.lock()) {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
