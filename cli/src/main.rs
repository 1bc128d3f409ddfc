//! Command-line shell for the forum client.
//!
//! Every invocation restores the session from the persisted credential, then
//! admits the command through the same route guards a navigation would pass.
//! A denied command prints where the session should go instead.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use forum_session::guard::{self, Admission};
use forum_session::types::{CommentRequest, LoginRequest, PostId, PostRequest, RegisterRequest, Topic, TopicId};
use forum_session::{
    ApiClient, ApiError, AuthError, AuthFlow, ClientConfig, ConfigError, FileTokenStore, MySubscriptions,
    ReqwestTransport, SessionStore, SubscriptionProtocol, ToggleError, TopicCatalog, Transition, TransportError,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Toggle(#[from] ToggleError),
    #[error("`{route}` is not available in this session; go to {redirect}")]
    Redirected { route: String, redirect: &'static str },
    #[error("no authenticated user")]
    NoUser,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "forum-cli", about = "Forum session and subscription CLI")]
struct Cli {
    #[arg(long, env = "FORUM_BASE_URL")]
    base_url: Option<String>,

    /// File holding the persisted credential.
    #[arg(long, env = "FORUM_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    #[arg(long, env = "FORUM_REQUEST_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    request_timeout_secs: Option<u64>,

    #[arg(long, env = "FORUM_CONNECT_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout_secs: Option<u64>,

    /// Clear the session when a protected call is rejected with 401/403.
    #[arg(long, env = "FORUM_CLEAR_SESSION_ON_UNAUTHORIZED", value_parser = clap::builder::BoolishValueParser::new())]
    clear_session_on_unauthorized: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        /// Email or user name.
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "FORUM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "FORUM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Me,
    Update {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "FORUM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Topics,
    Subscribe {
        topic_id: TopicId,
    },
    /// Unsubscribe from a topic listed on the profile.
    Unsubscribe {
        topic_id: TopicId,
    },
    Toggle {
        topic_id: TopicId,
    },
    Subscriptions,
    Posts,
    Post {
        post_id: PostId,
    },
    CreatePost {
        #[arg(long)]
        topic_id: TopicId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    Comment {
        #[arg(long)]
        post_id: PostId,
        #[arg(long)]
        content: String,
    },
}

impl Command {
    /// Client route the command stands in for; the guards decide on it.
    fn route(&self) -> String {
        match self {
            Self::Login { .. } => "/auth/login".to_owned(),
            Self::Register { .. } => "/auth/register".to_owned(),
            Self::Logout | Self::Me | Self::Update { .. } | Self::Unsubscribe { .. } | Self::Subscriptions => {
                "/me".to_owned()
            }
            Self::Topics | Self::Subscribe { .. } | Self::Toggle { .. } => "/topics".to_owned(),
            Self::Posts => guard::MAIN_ROUTE.to_owned(),
            Self::Post { post_id } | Self::Comment { post_id, .. } => format!("/posts/{post_id}"),
            Self::CreatePost { .. } => "/posts/create".to_owned(),
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(path) = &cli.token_path {
        config.token_path.clone_from(path);
    }
    if let Some(secs) = cli.request_timeout_secs {
        config.timeouts.request_secs = secs;
    }
    if let Some(secs) = cli.connect_timeout_secs {
        config.timeouts.connect_secs = secs;
    }
    if let Some(clear) = cli.clear_session_on_unauthorized {
        config.clear_session_on_unauthorized = clear;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let transport = ReqwestTransport::new(&config)?;
    let tokens = FileTokenStore::new(&config.token_path);
    tracing::debug!(base_url = transport.base_url(), token_path = %tokens.path().display(), "client configured");
    let session = SessionStore::new(Arc::new(tokens));
    let api = ApiClient::new(Arc::new(transport), session.clone())
        .with_unauthorized_policy(config.clear_session_on_unauthorized);
    let flow = AuthFlow::new(api);

    let _observer = session.subscribe(|s| {
        tracing::debug!(authenticated = s.is_authenticated(), "session changed");
    });

    if let Err(e) = flow.restore().await {
        tracing::warn!(error = %e, "continuing without a restored session");
    }

    let route = cli.command.route();
    if let Admission::Redirect(redirect) = guard::admit_when_ready(&session, &route).await {
        println!("redirect: {redirect}");
        return Err(CliError::Redirected { route, redirect });
    }

    run(&flow, cli.command).await
}

async fn run(flow: &AuthFlow, command: Command) -> Result<(), CliError> {
    let api = flow.api();
    match command {
        Command::Login { identifier, password } => {
            let user = flow.login(&LoginRequest { identifier, password }).await?;
            println!("logged in as {} <{}>", user.name, user.email);
        }
        Command::Register { email, name, password } => {
            let user = flow.register(&RegisterRequest { email, name, password }).await?;
            println!("registered {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            flow.logout()?;
            println!("logged out");
        }
        Command::Me => {
            let user = flow.session().current_user().ok_or(CliError::NoUser)?;
            print_json(&serde_json::to_value(&user)?)?;
        }
        Command::Update { email, name, password } => {
            let user = flow.update_profile(&RegisterRequest { email, name, password }).await?;
            println!("profile updated: {} <{}>", user.name, user.email);
        }
        Command::Topics => {
            for topic in api.topics().await? {
                print_topic(&topic);
            }
        }
        Command::Subscribe { topic_id } => {
            let protocol = SubscriptionProtocol::new(api.clone());
            let mut catalog = TopicCatalog::new(api.topics().await?);
            report(topic_id, protocol.subscribe(&mut catalog, topic_id).await?);
        }
        Command::Unsubscribe { topic_id } => {
            let user = flow.session().current_user().ok_or(CliError::NoUser)?;
            let protocol = SubscriptionProtocol::new(api.clone());
            let mut mine = MySubscriptions::new(user.topics);
            report(topic_id, protocol.unsubscribe(&mut mine, topic_id).await?);
            for topic in mine.topics() {
                print_topic(topic);
            }
        }
        Command::Toggle { topic_id } => {
            let protocol = SubscriptionProtocol::new(api.clone());
            let mut catalog = TopicCatalog::new(api.topics().await?);
            report(topic_id, protocol.toggle(&mut catalog, topic_id).await?);
        }
        Command::Subscriptions => {
            let user = flow.session().current_user().ok_or(CliError::NoUser)?;
            for topic in MySubscriptions::new(user.topics).topics() {
                print_topic(topic);
            }
        }
        Command::Posts => {
            for post in api.posts().await? {
                let topic = post.topic_title.as_deref().unwrap_or("-");
                println!("{:>5}  {}  [{topic}] {} ({})", post.id, post.date, post.title, post.author_name);
            }
        }
        Command::Post { post_id } => {
            print_json(&serde_json::to_value(api.post(post_id).await?)?)?;
        }
        Command::CreatePost { topic_id, title, content } => {
            println!("{}", api.create_post(&PostRequest { topic_id, title, content }).await?);
        }
        Command::Comment { post_id, content } => {
            println!("{}", api.create_comment(&CommentRequest { post_id, content }).await?);
        }
    }
    Ok(())
}

fn print_topic(topic: &Topic) {
    let mark = if topic.subscription { "x" } else { " " };
    println!("[{mark}] {:>5}  {}", topic.id, topic.title);
}

fn report(topic_id: TopicId, transition: Transition) {
    match transition {
        Transition::Subscribed => println!("subscribed to topic {topic_id}"),
        Transition::Unsubscribed => println!("unsubscribed from topic {topic_id}"),
        Transition::Unchanged => println!("topic {topic_id} unchanged"),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
