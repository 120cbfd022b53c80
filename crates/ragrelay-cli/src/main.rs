use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cliclack::input;
use console::style;
use futures::StreamExt;
use ragrelay::decoder;
use ragrelay::errors::RelayError;
use ragrelay::models::message::Message;
use serde_json::json;

#[derive(Parser)]
#[command(author, version, about = "Terminal client for the ragrelay chat server", long_about = None)]
struct Cli {
    /// Relay server to talk to
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    host: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question and print the streamed answer
    Ask { question: String },
    /// Interactive session; history is kept for the session only
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Ask { question } => {
            let mut history = Vec::new();
            run_turn(&client, &cli.host, &question, &mut history).await?;
        }
        Command::Chat => {
            println!(
                "ragrelay chat {}",
                style("- type \"exit\" to end the session").dim()
            );

            let mut history: Vec<Message> = Vec::new();
            loop {
                let question: String = input("Message:").placeholder("").interact()?;
                if question.trim().eq_ignore_ascii_case("exit") {
                    break;
                }
                run_turn(&client, &cli.host, &question, &mut history).await?;
            }
        }
    }

    Ok(())
}

/// One request/response turn: post the transcript, render updates as
/// frames decode, and append both sides to the session history.
async fn run_turn(
    client: &reqwest::Client,
    host: &str,
    question: &str,
    history: &mut Vec<Message>,
) -> Result<()> {
    let mut transcript: Vec<_> = history
        .iter()
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();
    transcript.push(json!({ "role": "user", "content": question }));

    let response = client
        .post(format!("{}/api/chat", host.trim_end_matches('/')))
        .json(&json!({ "messages": transcript }))
        .send()
        .await
        .context("failed to reach the relay server")?;

    if !response.status().is_success() {
        anyhow::bail!("relay server answered {}", response.status());
    }

    print!("{} ", style("assistant:").cyan().bold());
    std::io::stdout().flush()?;

    let mut answer = String::new();
    let mut updates = decoder::updates(response.bytes_stream());
    while let Some(update) = updates.next().await {
        match update {
            Ok(update) => {
                print!("{}", update.delta);
                std::io::stdout().flush()?;
                answer = update.assembled;
            }
            Err(RelayError::TransportInterrupted { partial }) => {
                // Keep what already arrived on screen and in history
                println!();
                eprintln!(
                    "{}",
                    style("connection lost before the answer finished").red()
                );
                answer = partial;
                break;
            }
            Err(e) => {
                println!();
                eprintln!("{}", style(format!("stream error: {}", e)).red());
                break;
            }
        }
    }
    println!();

    history.push(Message::user(question));
    history.push(Message::assistant(answer.trim_end()));
    Ok(())
}
