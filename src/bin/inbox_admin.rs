use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use portfolio_inbox::{
    backend::{init_backend, Backend},
    client::{ApiClient, HttpAuthBackend, HttpDocumentStore},
    dto::chat_dto::{ChatRequest, ChatResponse},
    models::message::{ContactForm, Message},
    services::{
        moderation::{DeleteOutcome, ModerationController},
        session::{SessionOrchestrator, View},
        submission::SubmissionController,
    },
    utils::{crypto::hash_password, logging::init_tracing, time::format_received},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(name = "inbox-admin", about = "Contact inbox client for the portfolio server")]
struct Cli {
    /// Base URL of the portfolio-inbox server
    #[arg(long, env = "INBOX_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message through the public contact form
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        body: String,
    },
    /// Sign in and moderate the inbox interactively
    Moderate {
        #[arg(long, env = "INBOX_ADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "INBOX_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Ask the portfolio assistant a question
    Chat { prompt: String },
    /// Print an argon2 hash for OPERATOR_PASSWORD_HASH
    HashPassword { password: String },
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();

    if let Command::HashPassword { password } = &cli.command {
        let hash = hash_password(password).map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
        println!("{hash}");
        return Ok(());
    }

    let api = ApiClient::new(&cli.api_url)?;
    init_backend(Backend::new(
        Arc::new(HttpDocumentStore::new(api.clone())),
        Arc::new(HttpAuthBackend::new(api.clone())),
    ))?;

    match cli.command {
        Command::Submit { name, email, body } => submit(ContactForm::new(name, email, body)).await,
        Command::Moderate { email, password } => moderate(email, password).await,
        Command::Chat { prompt } => chat(&api, prompt).await,
        Command::HashPassword { .. } => Ok(()),
    }
}

async fn submit(mut form: ContactForm) -> anyhow::Result<()> {
    let controller = SubmissionController::from_backend()?;
    match controller.submit(&mut form).await {
        Ok(message) => {
            println!("Message sent successfully! Thank you. (id {})", message.id);
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}

async fn chat(api: &ApiClient, prompt: String) -> anyhow::Result<()> {
    let res = api
        .http()
        .post(api.url("api/chat")?)
        .json(&ChatRequest { prompt })
        .send()
        .await
        .context("chat request failed")?
        .error_for_status()?;
    let body: ChatResponse = res.json().await?;
    println!("{}", body.text);
    Ok(())
}

async fn prompt_line(input: &mut Input, prompt: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

async fn moderate(email: String, password: Option<String>) -> anyhow::Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut orchestrator = SessionOrchestrator::from_backend()?;

    if orchestrator.attach().await != View::Login {
        bail!("unexpected session state before sign-in");
    }

    let password = match password {
        Some(p) => p,
        None => prompt_line(&mut input, "Password: ")
            .await?
            .context("no password given")?,
    };
    if let Err(err) = orchestrator.login(&email, &password).await {
        bail!("{err}");
    }
    if orchestrator.sync().await != View::Moderation {
        bail!("sign-in was not confirmed");
    }

    print_help();
    let mut term = String::new();
    render(&orchestrator, &term);

    loop {
        let Some(line) = prompt_line(&mut input, "> ").await? else {
            break;
        };
        let (cmd, arg) = match line.trim().split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line.trim(), ""),
        };

        match cmd {
            "" => {}
            "help" => print_help(),
            "list" => render(&orchestrator, &term),
            "search" => {
                term = arg.to_string();
                render(&orchestrator, &term);
            }
            "reload" => match orchestrator.reload().await {
                Ok(()) => render(&orchestrator, &term),
                Err(err) => println!("{err} Type `reload` to retry."),
            },
            "toggle" => {
                let Some(moderation) = orchestrator.moderation() else { continue };
                match moderation.toggle_read(arg).await {
                    Ok(read) => println!("{} marked as {}", arg, if read { "read" } else { "unread" }),
                    Err(err) => println!("{err}"),
                }
            }
            "delete" => {
                let Some(moderation) = orchestrator.moderation() else { continue };
                let confirmed = confirm_delete(&mut input, moderation, arg).await?;
                match moderation.delete_message(arg, |_| confirmed).await {
                    Ok(DeleteOutcome::Deleted) => println!("Deleted {arg}"),
                    Ok(DeleteOutcome::Declined) => println!("Kept {arg}"),
                    Err(err) => println!("{err}"),
                }
            }
            "logout" => match orchestrator.logout().await {
                Ok(()) => {
                    orchestrator.sync().await;
                    println!("Signed out.");
                    break;
                }
                Err(err) => println!("{err}"),
            },
            "quit" | "exit" => break,
            other => println!("Unknown command `{other}`. Type `help`."),
        }
    }

    orchestrator.detach();
    Ok(())
}

async fn confirm_delete(
    input: &mut Input,
    moderation: &ModerationController,
    id: &str,
) -> anyhow::Result<bool> {
    let Some(message) = moderation.messages().into_iter().find(|m| m.id == id) else {
        return Ok(false);
    };
    let answer = prompt_line(
        input,
        &format!("Are you sure you want to delete the message from {}? [y/N] ", message.name),
    )
    .await?;
    Ok(matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")))
}

fn print_help() {
    println!("Commands: list | search <term> | toggle <id> | delete <id> | reload | logout | quit");
}

fn render(orchestrator: &SessionOrchestrator, term: &str) {
    if let Some(err) = orchestrator.last_error() {
        println!("{err} Type `reload` to retry.");
        return;
    }
    let Some(moderation) = orchestrator.moderation() else {
        println!("Not signed in.");
        return;
    };
    let all = moderation.messages();
    if all.is_empty() {
        println!("No messages yet.");
        return;
    }
    let shown = moderation.filter(term);
    if shown.is_empty() {
        println!("No messages match \"{term}\".");
        return;
    }
    println!("{} messages, {} unread", all.len(), moderation.unread_count());
    for message in &shown {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let marker = if message.read { " " } else { "*" };
    println!(
        "{marker} {}  {}  <{}>  {}",
        message.id,
        message.name,
        message.email,
        format_received(message.received_at)
    );
    for line in message.body.lines() {
        println!("      {line}");
    }
}
