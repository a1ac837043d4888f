use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("vitals version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
