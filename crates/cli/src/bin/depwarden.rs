use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let code = depwarden_cli::main_entry().await?;
    if code.code() != 0 {
        std::process::exit(code.code());
    }
    Ok(())
}
