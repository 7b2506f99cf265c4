fn main() {
    #[cfg(feature = "cli")]
    cads::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("cads: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
