fn main() {
    if let Err(err) = chatwire::cli::main() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
