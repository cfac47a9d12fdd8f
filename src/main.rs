fn main() -> anyhow::Result<()> {
    evergreen::cli::run_cli()
}
