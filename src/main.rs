use std::env;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debtplan=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = debtplan::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("compare") => {
            let args = std::iter::once(raw_args[0].clone()).chain(raw_args[2..].iter().cloned());
            if let Err(e) = debtplan::api::run_cli(args) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: debtplan serve [port]");
            eprintln!(
                "       debtplan compare --debt NAME:BALANCE:APR:MIN [--debt ...] --budget N [--strategy snowball|avalanche] [--csv PATH] [--json PATH]"
            );
            std::process::exit(1);
        }
    }
}
