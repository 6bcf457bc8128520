mod callback;
mod sync;

use crate::error::Result;
use clap::Parser;

pub use callback::CallbackCli;

#[derive(Parser, Debug)]
#[command(name = "pacing-sync")]
#[command(about = "Sync Basis line item stats into pacing report spreadsheets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Basis API bearer token
    pub token: String,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        sync::execute(&self.token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_token_required() {
        let err = Cli::try_parse_from(["pacing-sync"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_token_parsed() {
        let cli = Cli::try_parse_from(["pacing-sync", "secret-token"]).unwrap();

        assert_eq!(cli.token, "secret-token");
    }

    #[test]
    fn test_callback_defaults() {
        let cli = CallbackCli::try_parse_from(["oauth-callback"]).unwrap();

        assert_eq!(cli.port, 8080);
        assert_eq!(cli.expected_state, None);
    }

    #[test]
    fn test_callback_flags() {
        let cli = CallbackCli::try_parse_from([
            "oauth-callback",
            "--port",
            "9000",
            "--expected-state",
            "xyz",
        ])
        .unwrap();

        assert_eq!(cli.port, 9000);
        assert_eq!(cli.expected_state.as_deref(), Some("xyz"));
    }
}
