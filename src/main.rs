fn main() -> anyhow::Result<()> {
    folder_notes::cli::run()
}
