use anyhow::Result;

fn main() -> Result<()> {
    ciscope_cli::main_entry()
}
