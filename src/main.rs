//! RoomMatch CLI
//!
//! Command-line front end for the RoomMatch client:
//! - Register, log in and out
//! - Edit the profile and answer the questionnaire
//! - Browse matches and chat with them
//! - Run matching (admins)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use roommatch::api::dto::Profile;
use roommatch::chat::{ChatEvent, ConversationId, HistoryEntry, MessageOrigin};
use roommatch::config::{generate_default_config, Config};
use roommatch::views::{
    AdminDashboard, ChatView, LoginForm, MatchListView, ProfileEditor, QuestionnaireForm,
    RegisterForm,
};
use roommatch::{ApiClient, FileStorage, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "roommatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find a roommate from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/roommatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Register {
        email: String,
        #[arg(short, long)]
        password: String,
        /// School name; partial names list suggestions
        #[arg(short, long)]
        school: String,
    },

    /// Log in and remember the session
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Log out and forget the session
    Logout,

    /// Show the current session
    Whoami,

    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// List the prompts available for your profile
    Prompts,

    /// Answer the lifestyle questionnaire
    Questionnaire {
        #[command(subcommand)]
        command: QuestionnaireCommand,
    },

    /// List your matches
    Matches {
        /// Show full profiles for these match ids
        #[arg(short, long)]
        expand: Vec<String>,
    },

    /// Check for a new match notification
    Notifications,

    /// Ask for a different match
    RequestMatch,

    /// Chat with a match
    Chat {
        #[command(subcommand)]
        command: ChatCommand,
    },

    /// Admin dashboard
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Print your profile
    Show,

    /// Update profile fields; omitted fields keep their value
    Update {
        #[arg(long)]
        hometown: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        graduation_year: Option<String>,
        #[arg(long)]
        interests: Option<String>,
        /// Prompt for slot N, as N=TEXT (N is 1-3)
        #[arg(long, value_name = "N=TEXT")]
        prompt: Vec<String>,
        /// Response for slot N, as N=TEXT (N is 1-3)
        #[arg(long, value_name = "N=TEXT")]
        response: Vec<String>,
        /// Image file to upload as the profile picture
        #[arg(long)]
        picture: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum QuestionnaireCommand {
    /// Print the questions
    Questions,
    /// Print your stored answers
    Show,
    /// Submit 25 comma-separated answers, each 1-7
    Submit { answers: String },
}

#[derive(Subcommand)]
pub enum ChatCommand {
    /// Print the conversation with a match
    History { match_id: String },
    /// Send one message
    Send { match_id: String, message: String },
    /// Interactive chat; type /quit to leave
    Live { match_id: String },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Matched/unmatched counts and current pairings
    Status,
    /// Run the matching algorithm
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    init_tracing(&config);

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let storage = Arc::new(FileStorage::new(config.session.storage_path()));
    let session = Arc::new(SessionManager::new(storage));
    session.rehydrate().await;

    let client = ApiClient::new(config.api.clone(), Arc::clone(&session))?;

    match cli.command {
        Commands::Register {
            email,
            password,
            school,
        } => {
            let mut form = RegisterForm::new();
            form.email = email;
            form.password = password;
            form.school = school;

            let suggestions = form.school_suggestions();
            if suggestions.len() == 1 && suggestions[0] != form.school {
                println!("Using school: {}", suggestions[0]);
                form.pick_school(suggestions[0]);
            }

            if !form.submit(&client).await {
                bail!("{}", form.error().unwrap_or("Registration failed"));
            }
            println!("{}", form.notice().unwrap_or("Registered."));
            println!("Log in with: roommatch login {}", form.email);
        }

        Commands::Login { email, password } => {
            let mut form = LoginForm::new(email, password);
            match form.submit(&client).await {
                Some(s) => {
                    println!("Logged in as user {}", s.user_id);
                    if s.is_admin {
                        println!("Admin dashboard available: roommatch admin status");
                    }
                }
                None => bail!("{}", form.error().unwrap_or("Login failed")),
            }
        }

        Commands::Logout => {
            client.sign_out().await;
            println!("Logged out.");
        }

        Commands::Whoami => match session.current_session().session() {
            Some(s) => {
                println!("User id: {}", s.user_id);
                if let Ok(claims) = roommatch::session::decode_claims(&s.token) {
                    if let Some(email) = &claims.sub {
                        println!("Email:   {}", email);
                    }
                    if claims.is_expired_at(chrono::Utc::now().timestamp()) {
                        println!("Token:   expired, log in again");
                    }
                }
                println!("Admin:   {}", if s.is_admin { "yes" } else { "no" });
            }
            None => println!("Not logged in."),
        },

        Commands::Profile { command } => {
            let mut editor = ProfileEditor::new();
            if !editor.load(&client).await {
                bail!("{}", editor.error().unwrap_or("Could not load profile"));
            }

            match command {
                ProfileCommand::Show => {
                    if let Some(profile) = editor.profile() {
                        print_profile(profile);
                    }
                    if let Some(url) = editor.picture_url(&client) {
                        println!("Picture:    {}", url);
                    }
                }
                ProfileCommand::Update {
                    hometown,
                    major,
                    graduation_year,
                    interests,
                    prompt,
                    response,
                    picture,
                } => {
                    let draft = editor.draft_mut();
                    if let Some(v) = hometown {
                        draft.hometown = v;
                    }
                    if let Some(v) = major {
                        draft.major = v;
                    }
                    if let Some(v) = graduation_year {
                        draft.graduation_year = v;
                    }
                    if let Some(v) = interests {
                        draft.interests = v;
                    }
                    for arg in &prompt {
                        let (slot, text) = parse_slot(arg)?;
                        draft.prompts[slot].prompt = text;
                    }
                    for arg in &response {
                        let (slot, text) = parse_slot(arg)?;
                        draft.prompts[slot].response = text;
                    }

                    let offered = editor.prompts();
                    if !offered.is_empty() {
                        for answer in &editor.draft().prompts {
                            if !answer.prompt.is_empty() && !offered.contains(&answer.prompt) {
                                eprintln!("Note: \"{}\" is not one of the offered prompts", answer.prompt);
                            }
                        }
                    }

                    if let Some(path) = picture {
                        let bytes = tokio::fs::read(&path)
                            .await
                            .with_context(|| format!("reading {}", path.display()))?;
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "picture".to_string());
                        editor.attach_picture(name, bytes);
                    }

                    if !editor.submit(&client).await {
                        bail!("{}", editor.error().unwrap_or("Failed to update profile"));
                    }
                    println!("{}", editor.notice().unwrap_or("Profile updated."));
                }
            }
        }

        Commands::Prompts => {
            for (i, prompt) in client.fetch_prompts().await?.iter().enumerate() {
                println!("{:>2}. {}", i + 1, prompt);
            }
        }

        Commands::Questionnaire { command } => {
            let mut form = QuestionnaireForm::new();
            match command {
                QuestionnaireCommand::Questions => {
                    for (i, (question, _)) in form.questions().enumerate() {
                        println!("{:>2}. {}", i + 1, question);
                    }
                    println!();
                    println!("Answer each from 1 (not at all) to 7 (very much).");
                }
                QuestionnaireCommand::Show => {
                    if !form.load(&client).await {
                        bail!("{}", form.error().unwrap_or("Could not load answers"));
                    }
                    if !form.has_stored_answers() {
                        println!("No answers submitted yet.");
                    }
                    for (i, (question, answer)) in form.questions().enumerate() {
                        println!("{:>2}. [{}] {}", i + 1, answer, question);
                    }
                }
                QuestionnaireCommand::Submit { answers } => {
                    let values = answers
                        .split(',')
                        .map(|s| s.trim().parse::<u8>())
                        .collect::<Result<Vec<_>, _>>()
                        .context("answers must be numbers between 1 and 7")?;
                    form.set_answers(&values)?;

                    if !form.submit(&client).await {
                        bail!("{}", form.error().unwrap_or("Failed to submit responses"));
                    }
                    println!("{}", form.notice().unwrap_or("Submitted."));
                }
            }
        }

        Commands::Matches { expand } => {
            let mut view = MatchListView::new();
            if !view.load(&client).await {
                bail!("{}", view.error().unwrap_or("Could not load matches"));
            }
            for id in &expand {
                view.expand(id);
            }

            if view.matches().is_empty() {
                println!("No matches yet.");
            } else {
                println!("{:<8} {:<32} {}", "ID", "Match", "Score");
                println!("{}", "-".repeat(48));
                for m in view.matches() {
                    println!("{:<8} {:<32} {}", m.match_id, m.display_name, m.score_label());
                    if view.is_expanded(&m.match_id) {
                        match &m.profile {
                            Some(profile) => print_profile(profile),
                            None => println!("  (profile unavailable)"),
                        }
                        println!();
                    }
                }
            }
        }

        Commands::Notifications => {
            let mut view = MatchListView::new();
            if view.check_notification(&client).await {
                if let Some(n) = view.notification() {
                    println!("{}", n.message);
                    if let Some(id) = &n.match_id {
                        println!("Match id: {}", id);
                    }
                }
            } else {
                println!("No new matches.");
            }
        }

        Commands::RequestMatch => {
            let mut view = MatchListView::new();
            if !view.request_new_match(&client).await {
                bail!("{}", view.error().unwrap_or("Request failed"));
            }
            println!("{}", view.notice().unwrap_or("Requested a new match."));
        }

        Commands::Chat { command } => {
            let user_id = match session.current_session().user_id() {
                Some(id) => id.to_string(),
                None => bail!("Please log in to continue."),
            };

            match command {
                ChatCommand::History { match_id } => {
                    let mut view = ChatView::new(ConversationId::new(user_id, match_id));
                    if !view.load(&client).await {
                        bail!("{}", view.error().unwrap_or("Could not load messages"));
                    }
                    print_chat_header(&view);
                    for entry in view.history().entries() {
                        print_entry(entry);
                    }
                }
                ChatCommand::Send { match_id, message } => {
                    client.send_message(&user_id, &match_id, &message).await?;
                    println!("Message sent.");
                }
                ChatCommand::Live { match_id } => {
                    let policy = config.chat.reconnect_policy();
                    run_live_chat(&client, ConversationId::new(user_id, match_id), policy).await?;
                }
            }
        }

        Commands::Admin { command } => {
            if !AdminDashboard::is_visible(&client) {
                bail!("Admin access required.");
            }
            let mut dashboard = AdminDashboard::new();

            let ok = match command {
                AdminCommand::Status => dashboard.load(&client).await,
                AdminCommand::Run => dashboard.run_matching(&client).await,
            };
            if !ok {
                bail!("{}", dashboard.error().unwrap_or("Admin request failed"));
            }

            if let Some(notice) = dashboard.notice() {
                println!("{}", notice);
            }
            if let Some(status) = dashboard.status() {
                println!("Matched users:   {}", status.matched_users);
                println!("Unmatched users: {}", status.unmatched_users);
            }
            println!();
            if dashboard.pairings().is_empty() {
                println!("No pairings yet.");
            } else {
                println!("Pairings:");
                for pairing in dashboard.pairings() {
                    println!("  {} <-> {}", pairing.user1, pairing.user2);
                }
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn run_live_chat(
    client: &ApiClient,
    conversation: ConversationId,
    policy: roommatch::ReconnectPolicy,
) -> anyhow::Result<()> {
    let mut view = ChatView::new(conversation);
    if !view.load(client).await {
        eprintln!("{}", view.error().unwrap_or("Could not load messages"));
    }
    print_chat_header(&view);
    for entry in view.history().entries() {
        print_entry(entry);
    }

    view.connect(client, policy)?;
    println!("-- connecting; type /quit to leave --");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) if text.trim() == "/quit" => break,
                Some(text) if text.trim().is_empty() => {}
                Some(text) => {
                    if let Err(e) = view.send(client, &text).await {
                        eprintln!("{}", e.user_message());
                    }
                }
                None => break,
            },
            event = view.next_event() => match event {
                Some(ChatEvent::Opened) => println!("-- connected --"),
                Some(ChatEvent::Received(message)) => println!("them: {}", message.content),
                Some(ChatEvent::Reconnecting { attempt, delay }) => {
                    eprintln!("-- connection lost, retry {} in {:?} --", attempt, delay);
                }
                Some(ChatEvent::Closed { reason }) => {
                    eprintln!("-- chat closed ({:?}) --", reason);
                    break;
                }
                Some(ChatEvent::Sent(_)) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.close();
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("roommatch={}", config.logging.level).into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Parse `N=TEXT` into a 0-based prompt slot and text
fn parse_slot(arg: &str) -> anyhow::Result<(usize, String)> {
    let (slot, text) = arg
        .split_once('=')
        .with_context(|| format!("expected N=TEXT, got {:?}", arg))?;
    match slot.trim().parse::<usize>() {
        Ok(n @ 1..=3) => Ok((n - 1, text.to_string())),
        _ => bail!("prompt slot must be 1, 2 or 3, got {:?}", slot),
    }
}

fn print_profile(profile: &Profile) {
    println!("  Email:      {}", profile.email);
    println!("  School:     {}", profile.school);
    println!("  Hometown:   {}", profile.hometown);
    println!("  Major:      {}", profile.major);
    println!("  Class of:   {}", profile.graduation_year);
    println!("  Interests:  {}", profile.interests);
    for answer in profile.prompts.iter().filter(|a| !a.prompt.is_empty()) {
        println!("  {}", answer.prompt);
        println!("    {}", answer.response);
    }
}

fn print_chat_header(view: &ChatView) {
    let name = view
        .peer()
        .map(|p| p.email.as_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(view.conversation().peer_id.as_str());
    println!("Chat with {}", name);
    println!("{}", "-".repeat(40));
}

fn print_entry(entry: &HistoryEntry) {
    let who = match entry.origin {
        MessageOrigin::Local => "me",
        MessageOrigin::Remote => "them",
    };
    println!("{}: {}", who, entry.message.content);
}
