use anyhow::Result;
use console::style;

const NAME: &str = env!("CARGO_BIN_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn banner() -> String {
    format!("{NAME} {VERSION}")
}

pub async fn execute() -> Result<()> {
    println!("{}", style(banner()).bold().cyan());
    if !DESCRIPTION.is_empty() {
        println!("{}", style(DESCRIPTION).dim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_names_the_binary() {
        let banner = banner();
        assert!(banner.starts_with("glimpse "));
        assert!(banner.ends_with(VERSION));
    }
}
