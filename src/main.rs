fn main() -> anyhow::Result<()> {
    padnote::cli::run()
}
