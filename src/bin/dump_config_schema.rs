use anyhow::{Context, Result};

fn main() -> Result<()> {
    let schema = capshare::Config::json_schema();
    let rendered = serde_json::to_string_pretty(&schema).context("failed to render schema")?;
    println!("{rendered}");
    Ok(())
}
