//! `idtoken-verify [token.json]` — verify an identity token read from a file or stdin.

use std::io::Read as _;

use idtoken_core::token::RawIdentityToken;
use idtoken_verifier::{config::VerifierConfig, verifier::IdentityVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = VerifierConfig::from_env()?;

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let raw: RawIdentityToken = serde_json::from_str(&input)?;

    let verifier = IdentityVerifier::from_config(&config)?;
    let verified = verifier.verify(&raw).await?;
    log::info!("verification result: {verified}");
    println!("{verified}");

    if !verified {
        std::process::exit(1);
    }
    Ok(())
}
