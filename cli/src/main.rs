fn main() -> anyhow::Result<()> {
    graphupdate_cli::run()
}
