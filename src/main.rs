fn main() {
    if let Err(e) = nexchat::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
