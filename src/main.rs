fn main() -> anyhow::Result<()> {
    formwarden::run()?;
    Ok(())
}
