use anyhow::{Context, Result};
use chrono::Utc;
use storekit_tools::{jws::CompactJws, StoreConfig, TokenClaims, TokenIssuer};

pub fn print_bearer_token() -> Result<()> {
    let config = StoreConfig::new_from_env_or_default();
    let issuer = TokenIssuer::with_lifetime(&config.credentials, config.token_lifetime)
        .context("Could not create a token issuer from the configured credentials")?;
    let token = issuer.current_token_at(Utc::now())?;
    let jws = CompactJws::parse(&token.token)?;
    let header = jws.header()?;
    let claims = jws.claims::<TokenClaims>()?;
    println!("----------------------------- Bearer Token -----------------------------");
    println!("environment: {}", config.credentials.environment);
    println!("alg: {}", header.alg);
    println!("kid: {}", header.kid.unwrap_or_default());
    println!("iss: {}", claims.iss);
    println!("aud: {}", claims.aud);
    println!("bid: {}", claims.bid);
    println!("iat: {}", claims.iat);
    println!("expires: {}", token.expires_at);
    println!("token:\n{}", token.token);
    println!("------------------------------------------------------------------------");
    Ok(())
}
