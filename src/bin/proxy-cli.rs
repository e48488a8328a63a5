use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Admin CLI for the quickstart proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and the instance table
    Status,
    /// Show the current verbosity flags
    Env,
    /// Change verbosity flags; omitted flags keep their value
    SetEnv {
        #[arg(long)]
        verbose: Option<bool>,
        #[arg(long)]
        show_query_string: Option<bool>,
        #[arg(long)]
        show_body: Option<bool>,
        #[arg(long)]
        format_json: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)).send().await?,
        Commands::Env => client.get(format!("{}/admin/env", cli.url)).send().await?,
        Commands::SetEnv {
            verbose,
            show_query_string,
            show_body,
            format_json,
        } => {
            let params: Vec<(&str, String)> = [
                ("verbose", verbose),
                ("show_query_string", show_query_string),
                ("show_body", show_body),
                ("format_json", format_json),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v.to_string())))
            .collect();

            client
                .get(format!("{}/admin/set-env", cli.url))
                .query(&params)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
