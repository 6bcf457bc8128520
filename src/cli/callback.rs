use crate::callback::{CallbackListener, DEFAULT_PORT};
use crate::error::Result;
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "oauth-callback")]
#[command(about = "Capture the OAuth authorization code redirected to localhost", long_about = None)]
#[command(version)]
pub struct CallbackCli {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Reject redirects whose state differs from this value
    #[arg(long)]
    pub expected_state: Option<String>,
}

impl CallbackCli {
    pub fn run(&self) -> Result<()> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let listener = CallbackListener::bind(addr, self.expected_state.clone())?;

        println!(
            "Waiting for OAuth callback on http://localhost:{}/",
            listener.local_addr()?.port()
        );

        listener.serve()
    }
}
