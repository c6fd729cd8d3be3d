fn main() {
    if let Err(e) = sourcescope_cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
