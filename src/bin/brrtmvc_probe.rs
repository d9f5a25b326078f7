fn main() {
    if let Err(err) = brrtrouter_mvc::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
