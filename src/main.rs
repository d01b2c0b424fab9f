fn main() -> anyhow::Result<()> {
    social_core::cli::run()
}
