use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profile_service::client::{
    ApiClient, ClientError, PasswordResetForm, ProfileApi, ProfileForm,
    RestIdentityProvider, Session, SignInForm, SignUpForm, SocialLinksManager,
};
use profile_service::config::Config;
use profile_service::services::identity::IdentityVerifier;
use profile_service::validation::{Credentials, PasswordReset, SignUpData};

#[derive(Parser)]
#[command(name = "profilectl")]
#[command(about = "Edit a user profile through the profile service API")]
#[command(version)]
struct Cli {
    #[arg(long, env = "PROFILE_API_URL", default_value = "http://localhost:8080", global = true)]
    api_url: String,

    #[arg(long, env = "PROFILE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[arg(
        long,
        env = "IDENTITY_PROVIDER_URL",
        default_value = "https://identitytoolkit.googleapis.com/v1",
        global = true
    )]
    identity_url: String,

    #[arg(long, env = "IDENTITY_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the current profile")]
    Show,

    #[command(about = "Update profile fields, optionally with a new profile image")]
    Update {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, help = "JPEG, PNG or GIF file to upload as the profile image")]
        image: Option<PathBuf>,
    },

    #[command(about = "Manage social links")]
    Links {
        #[command(subcommand)]
        cmd: LinksCommands,
    },

    #[command(about = "Sign in and print the ID token to use as PROFILE_TOKEN")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROFILE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "Create an account and print its ID token")]
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROFILE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, help = "Defaults to --password")]
        confirm_password: Option<String>,
    },

    #[command(about = "Send a password reset email")]
    ResetPassword {
        #[arg(long)]
        email: String,
    },

    #[command(about = "Show who the current token belongs to")]
    Whoami,

    #[command(about = "Mint a token with the local IDENTITY_JWT_SECRET (development only)")]
    DevToken {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum LinksCommands {
    #[command(about = "List social links")]
    List,
    #[command(about = "Add a link (twitter, instagram, tiktok or niconico)")]
    Add { platform: String, url: String },
    #[command(about = "Remove a link by id")]
    Remove { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_service=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::DevToken { uid, email } = &cli.command {
        let config = Config::from_env()?;
        let verifier = IdentityVerifier::new(&config.identity);
        let token = verifier.issue(
            uid,
            email.as_deref(),
            chrono::Duration::hours(config.identity.dev_token_hours),
        )?;
        println!("{}", token);
        return Ok(());
    }

    let result = match &cli.command {
        Commands::Login { .. } | Commands::Signup { .. } | Commands::ResetPassword { .. } => {
            let api_key = cli
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("No API key given; pass --api-key or set IDENTITY_API_KEY"))?;
            let provider = RestIdentityProvider::new(&cli.identity_url, api_key)?;
            authenticate(&cli, &provider).await
        }
        _ => {
            let token = cli
                .token
                .clone()
                .ok_or_else(|| anyhow!("No token given; pass --token or set PROFILE_TOKEN"))?;
            let client = ApiClient::new(&cli.api_url, token)?;
            run(&cli, &client).await
        }
    };

    match result {
        Err(ClientError::Validation(report)) => {
            for violation in report.violations() {
                eprintln!("{}: {}", violation.field, violation.message);
            }
            bail!("{} invalid field(s)", report.violations().len())
        }
        other => Ok(other?),
    }
}

async fn authenticate(cli: &Cli, provider: &RestIdentityProvider) -> Result<(), ClientError> {
    let session = match &cli.command {
        Commands::Login { email, password } => {
            let mut form = SignInForm::new(Credentials {
                email: email.clone(),
                password: password.clone(),
            });
            form.submit(provider).await?
        }
        Commands::Signup {
            email,
            password,
            confirm_password,
        } => {
            let mut form = SignUpForm::new(SignUpData {
                email: email.clone(),
                password: password.clone(),
                confirm_password: confirm_password.clone().unwrap_or_else(|| password.clone()),
            });
            form.submit(provider).await?
        }
        Commands::ResetPassword { email } => {
            let mut form = PasswordResetForm::new(PasswordReset {
                email: email.clone(),
            });
            form.submit(provider).await?;
            println!("Password reset email sent to {}", email);
            return Ok(());
        }
        _ => return Ok(()),
    };

    print_session(cli, &session);
    Ok(())
}

fn print_session(cli: &Cli, session: &Session) {
    if cli.json {
        print_json(session);
    } else {
        eprintln!(
            "Signed in as {} ({})",
            session.email.as_deref().unwrap_or("-"),
            session.uid
        );
        println!("{}", session.id_token);
    }
}

async fn run(cli: &Cli, client: &ApiClient) -> Result<(), ClientError> {
    match &cli.command {
        Commands::Show => {
            let Some(profile) = client.get_profile().await? else {
                println!("No profile saved yet");
                return Ok(());
            };

            if cli.json {
                print_json(&profile);
            } else {
                println!("Display name: {}", profile.display_name.as_deref().unwrap_or("-"));
                println!("Bio:          {}", profile.bio.as_deref().unwrap_or("-"));
                println!("Email:        {}", profile.contact_email.as_deref().unwrap_or("-"));
                println!("Image:        {}", profile.profile_image_url.as_deref().unwrap_or("-"));
                println!("Updated:      {}", profile.updated_at);
                print_links(&profile.social_links);
            }
        }

        Commands::Update {
            display_name,
            bio,
            email,
            image,
        } => {
            let mut form = match client.get_profile().await? {
                Some(profile) => ProfileForm::from_profile(&profile),
                None => ProfileForm::default(),
            };

            if let Some(display_name) = display_name {
                form.data.display_name = display_name.clone();
            }
            if let Some(bio) = bio {
                form.data.bio = bio.clone();
            }
            if let Some(email) = email {
                form.data.contact_email = email.clone();
            }
            if let Some(path) = image {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ClientError::Upload(format!("{}: {}", path.display(), e)))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                form.choose_image(filename, bytes);
            }

            form.submit(client).await?;
            println!("Profile updated successfully");
        }

        Commands::Links { cmd } => {
            let mut manager = SocialLinksManager::new();
            manager.load(client).await?;

            match cmd {
                LinksCommands::List => {}
                LinksCommands::Add { platform, url } => {
                    manager.add(platform, url)?;
                    manager.sync(client).await?;
                }
                LinksCommands::Remove { id } => {
                    if !manager.remove(id) {
                        return Err(ClientError::Api {
                            status: 404,
                            message: format!("no social link with id {}", id),
                        });
                    }
                    manager.sync(client).await?;
                }
            }

            if cli.json {
                print_json(manager.links());
            } else {
                print_links(manager.links());
            }
        }

        Commands::Whoami => {
            let identity = client.me().await?;
            if cli.json {
                print_json(&identity);
            } else {
                println!(
                    "Signed in as {} ({})",
                    identity.email.as_deref().unwrap_or("-"),
                    identity.uid
                );
            }
        }

        Commands::Login { .. }
        | Commands::Signup { .. }
        | Commands::ResetPassword { .. }
        | Commands::DevToken { .. } => {}
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

fn print_links(links: &[profile_service::db::SocialLink]) {
    if links.is_empty() {
        println!("No social links");
        return;
    }
    for link in links {
        println!("{}  {:<10} {}", link.id, link.platform.display_name(), link.url);
    }
}
