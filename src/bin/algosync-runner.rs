use anyhow::Result;

fn main() -> Result<()> {
    algosync_runner::cli::run()
}
